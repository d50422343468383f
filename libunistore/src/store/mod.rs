//! The store: single owner of application state
//!
//! A root [`Store`] owns its state inside an actor task. That task is the
//! store's serial context: it is the only place the reducer runs, the only
//! writer of state, and the only place observers are called. Everything
//! else talks to it through a channel:
//!
//! ```text
//! dispatch(action)
//!     -> ActionScheduler (Immediate | Debounce | Throttle, keyed by identity)
//!     -> actor: reduce -> publish to observers -> spawn effect
//!                                                   |
//!        follow-up actions <------------------------+
//! ```
//!
//! Effects run as their own Tokio tasks, concurrently with each other and
//! with later dispatches, but every action they produce queues behind the
//! actions already delivered. State transitions are therefore ordered by
//! delivery, never interleaved.
//!
//! Derived stores ([`Store::derived`]) share the root's serial context and
//! forward their writes to it.

mod chain;
pub mod derived;
mod hub;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::action::{Action, Schedule};
use crate::config::SchedulerConfig;
use crate::effect::Effect;
use crate::error::EffectError;
use crate::reducer::Reducer;
use crate::scheduler::ActionScheduler;

pub use chain::DispatchHandle;

use chain::{Chain, Reducing};
use hub::{Hub, Observer};

type Job = Box<dyn FnOnce() + Send>;

enum Command<A> {
    /// Run the reducer for a released action
    Apply { action: A, chain: Arc<Chain> },
    /// Run arbitrary work on the serial context
    Run(Job),
}

/// Handle to a root store's serial context
#[derive(Clone)]
pub(crate) struct MainContext {
    post: Arc<dyn Fn(Job) + Send + Sync>,
}

impl MainContext {
    pub(crate) fn run(&self, job: Job) {
        (self.post)(job)
    }
}

/// Entry point of a store's write path
pub(crate) trait Forward<A>: Send + Sync {
    fn forward(&self, action: A, chain: Arc<Chain>);
}

/// Write path of a root store: schedule, then enqueue for the actor
struct Dispatcher<A> {
    tx: mpsc::UnboundedSender<Command<A>>,
    scheduler: ActionScheduler,
    runtime: Handle,
}

impl<A: Action> Forward<A> for Dispatcher<A> {
    fn forward(&self, action: A, chain: Arc<Chain>) {
        let identity = action.identity();
        let schedule = action.schedule();
        debug!(action = %identity, ?schedule, "Dispatching action");

        let tx = self.tx.clone();
        let release = move || {
            let sent = tx.send(Command::Apply { action, chain });
            if let Err(mpsc::error::SendError(Command::Apply { chain, .. })) = sent {
                warn!("Store stopped, action discarded");
                chain.fail(EffectError::StoreStopped("store is no longer running".to_string()));
            }
        };

        // Timers and clocks must be the store's runtime, whatever thread dispatches
        let _runtime = self.runtime.enter();
        match schedule {
            Schedule::Immediate => release(),
            Schedule::Debounce(delay) => self.scheduler.debounce(&identity, delay, release),
            Schedule::Throttle(window) => self.scheduler.throttle(&identity, window, release),
        }
    }
}

/// Construction options for a root store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    scheduler: ActionScheduler,
    namespace: Option<String>,
    isolate: bool,
    runtime: Option<Handle>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            scheduler: ActionScheduler::shared(),
            namespace: None,
            isolate: true,
            runtime: None,
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from the `[scheduler]` config section
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::default().isolate(config.isolate_stores)
    }

    /// Use `scheduler` instead of the process-wide one
    pub fn scheduler(mut self, scheduler: ActionScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Prefix this store's action identities with `namespace`
    ///
    /// Stores given the same namespace share debounce/throttle slots.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Give the store a unique namespace when none is set (default `true`).
    ///
    /// With `false` and no namespace, identities land in the scheduler's
    /// shared namespace and may collide with other stores.
    pub fn isolate(mut self, isolate: bool) -> Self {
        self.isolate = isolate;
        self
    }

    /// Runtime hosting the store's actor and effects (default: the current one)
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    fn resolve_scheduler(&self) -> ActionScheduler {
        match (&self.namespace, self.isolate) {
            (Some(namespace), _) => self.scheduler.scoped(namespace),
            (None, true) => self.scheduler.scoped(&format!("store-{}", Uuid::new_v4())),
            (None, false) => self.scheduler.clone(),
        }
    }
}

/// Cancels an observer registration when dropped
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    active: Arc<AtomicBool>,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Stop receiving state updates
    pub fn unsubscribe(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Typed state container driven by actions
///
/// Cloning a `Store` clones the handle; all clones share one state.
pub struct Store<S, A, E = ()> {
    sink: Arc<dyn Forward<A>>,
    hub: Arc<Hub<S>>,
    context: MainContext,
    env: Arc<E>,
    upstream: Option<Arc<Subscription>>,
}

impl<S, A, E> Clone for Store<S, A, E> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            hub: self.hub.clone(),
            context: self.context.clone(),
            env: self.env.clone(),
            upstream: self.upstream.clone(),
        }
    }
}

impl<S, A, E> Store<S, A, E>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
    E: Send + Sync + 'static,
{
    /// Create a root store using the process-wide scheduler, isolated under
    /// a fresh namespace
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime. Use
    /// [`with_options`](Self::with_options) with [`StoreOptions::runtime`]
    /// to build a store from plain threads.
    pub fn new<R>(initial: S, reducer: R, env: E) -> Self
    where
        R: Reducer<S, A, E> + 'static,
    {
        Self::with_options(initial, reducer, env, StoreOptions::default())
    }

    pub fn with_options<R>(initial: S, reducer: R, env: E, options: StoreOptions) -> Self
    where
        R: Reducer<S, A, E> + 'static,
    {
        let runtime = options.runtime.clone().unwrap_or_else(Handle::current);
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Arc::new(Hub::new(initial.clone()));
        let env = Arc::new(env);

        let context = {
            let tx = tx.clone();
            MainContext {
                post: Arc::new(move |job: Job| {
                    let _ = tx.send(Command::Run(job));
                }),
            }
        };

        let dispatcher = Arc::new(Dispatcher {
            tx,
            scheduler: options.resolve_scheduler(),
            runtime: runtime.clone(),
        });

        runtime.spawn(run_actor(
            initial,
            reducer,
            env.clone(),
            hub.clone(),
            rx,
            Arc::downgrade(&dispatcher),
        ));

        Self {
            sink: dispatcher,
            hub,
            context,
            env,
            upstream: None,
        }
    }
}

impl<S, A, E> Store<S, A, E>
where
    S: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    /// Dispatch `action` without waiting for it
    pub fn dispatch(&self, action: A) {
        self.sink.forward(action, Chain::new(None));
    }

    /// Dispatch `action` and call `completed` once it and every follow-up
    /// effect it caused have settled
    ///
    /// `completed` receives the first uncaught effect failure of the chain.
    /// An action dropped or superseded by the scheduler completes with
    /// `Ok(())`.
    pub fn dispatch_with<F>(&self, action: A, completed: F)
    where
        F: FnOnce(Result<(), EffectError>) + Send + 'static,
    {
        self.sink.forward(action, Chain::new(Some(Box::new(completed))));
    }

    /// Dispatch `action` and return a handle to await its whole chain
    pub fn send(&self, action: A) -> DispatchHandle {
        let (handle, completion) = DispatchHandle::new();
        self.sink.forward(action, Chain::new(Some(completion)));
        handle
    }

    /// Latest published state
    pub fn state(&self) -> S {
        self.hub.snapshot()
    }

    /// Observe the current state and every later replacement
    ///
    /// The observer runs on the store's serial context: once with the state
    /// current when the registration is processed, then after each change.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let id = self.hub.reserve();
        let active = Arc::new(AtomicBool::new(true));
        let observer: Observer<S> = Arc::new(observer);

        {
            let hub = self.hub.clone();
            let active = active.clone();
            self.context.run(Box::new(move || hub.attach(id, active, observer)));
        }

        let hub = self.hub.clone();
        let flag = active.clone();
        Subscription {
            active,
            release: Some(Box::new(move || hub.detach(id, &flag))),
        }
    }

    /// Environment passed to the reducer
    pub fn environment(&self) -> &E {
        &self.env
    }

    /// `false` for stores built with [`derived`](Self::derived)
    pub fn is_root(&self) -> bool {
        self.upstream.is_none()
    }
}

impl<S: std::fmt::Debug + Clone, A, E> std::fmt::Debug for Store<S, A, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.hub.snapshot())
            .field("root", &self.upstream.is_none())
            .finish_non_exhaustive()
    }
}

async fn run_actor<S, A, E, R>(
    mut state: S,
    reducer: R,
    env: Arc<E>,
    hub: Arc<Hub<S>>,
    mut rx: mpsc::UnboundedReceiver<Command<A>>,
    dispatcher: Weak<Dispatcher<A>>,
) where
    S: Clone + Send + Sync + 'static,
    A: Action,
    E: Send + Sync + 'static,
    R: Reducer<S, A, E>,
{
    while let Some(command) = rx.recv().await {
        match command {
            Command::Apply { action, chain } => {
                let identity = action.identity();
                let reducing = Reducing(&chain);
                let (next, effect) = reducer.reduce(state, action, &env);
                drop(reducing);
                state = next;
                hub.publish(state.clone());
                trace!(action = %identity, "State replaced");

                if effect.is_none() {
                    continue;
                }
                let Some(dispatcher) = dispatcher.upgrade() else {
                    debug!(action = %identity, "Store released, effect not started");
                    continue;
                };
                tokio::spawn(run_effect(effect, dispatcher, chain, identity));
            }
            Command::Run(job) => job(),
        }
    }
    debug!("Store actor stopped");
}

async fn run_effect<A: Action>(
    effect: Effect<A>,
    dispatcher: Arc<Dispatcher<A>>,
    chain: Arc<Chain>,
    origin: String,
) {
    let mut outputs = effect.into_stream();
    while let Some(output) = outputs.next().await {
        match output {
            Ok(action) => dispatcher.forward(action, chain.clone()),
            Err(error) => {
                warn!(origin = %origin, %error, "Uncaught effect failure");
                chain.fail(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Counter {
        count: i64,
    }

    #[derive(Debug, Clone)]
    enum CounterAction {
        Add(i64),
        AddLater(i64),
        Fail,
        Crash,
    }

    impl Action for CounterAction {
        fn identity(&self) -> String {
            match self {
                CounterAction::Add(_) => "counter.add".to_string(),
                CounterAction::AddLater(_) => "counter.add_later".to_string(),
                CounterAction::Fail => "counter.fail".to_string(),
                CounterAction::Crash => "counter.crash".to_string(),
            }
        }
    }

    fn reducer(state: Counter, action: CounterAction, _env: &()) -> (Counter, Effect<CounterAction>) {
        match action {
            CounterAction::Add(n) => (Counter { count: state.count + n }, Effect::none()),
            CounterAction::AddLater(n) => (
                state,
                Effect::future(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    CounterAction::Add(n)
                }),
            ),
            CounterAction::Fail => (
                state,
                Effect::task(async { Err::<CounterAction, _>(EffectError::Network("timeout".into())) }),
            ),
            CounterAction::Crash => panic!("reducer bug"),
        }
    }

    fn store() -> Store<Counter, CounterAction> {
        Store::with_options(
            Counter::default(),
            reducer,
            (),
            StoreOptions::new().scheduler(ActionScheduler::new()),
        )
    }

    #[tokio::test]
    async fn test_send_waits_for_reducer() {
        let store = store();
        store.send(CounterAction::Add(2)).wait().await.unwrap();
        assert_eq!(store.state().count, 2);
        assert!(store.is_root());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_waits_for_follow_up_effects() {
        let store = store();
        store.send(CounterAction::AddLater(5)).wait().await.unwrap();
        assert_eq!(store.state().count, 5);
    }

    #[tokio::test]
    async fn test_uncaught_failure_reaches_root_completion() {
        let store = store();
        let result = store.send(CounterAction::Fail).wait().await;
        assert_eq!(result, Err(EffectError::Network("timeout".into())));

        // The store keeps working afterwards
        store.send(CounterAction::Add(1)).wait().await.unwrap();
        assert_eq!(store.state().count, 1);
    }

    #[tokio::test]
    async fn test_reducer_panic_is_reported_not_hidden() {
        let store = store();
        store.send(CounterAction::Add(1)).wait().await.unwrap();

        let result = store.send(CounterAction::Crash).wait().await;
        assert_eq!(result, Err(EffectError::StoreStopped("reducer panicked".into())));

        // Later dispatches cannot be applied either
        let result = store.send(CounterAction::Add(1)).wait().await;
        assert!(matches!(result, Err(EffectError::StoreStopped(_))));
        assert_eq!(store.state().count, 1);
    }

    #[tokio::test]
    async fn test_dispatch_with_fires_callback_once() {
        let store = store();
        let (tx, rx) = tokio::sync::oneshot::channel();
        store.dispatch_with(CounterAction::Add(3), move |result| {
            let _ = tx.send(result);
        });
        assert_eq!(rx.await.unwrap(), Ok(()));
        assert_eq!(store.state().count, 3);
    }

    #[tokio::test]
    async fn test_subscriber_sees_initial_and_each_change() {
        let store = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = store.subscribe(move |state: &Counter| sink.lock().unwrap().push(state.count));

        store.send(CounterAction::Add(1)).wait().await.unwrap();
        store.send(CounterAction::Add(1)).wait().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);

        subscription.unsubscribe();
        store.send(CounterAction::Add(1)).wait().await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let store = store();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = seen.clone();
        let subscription = store.subscribe(move |_: &Counter| *sink.lock().unwrap() += 1);
        store.send(CounterAction::Add(1)).wait().await.unwrap();
        assert!(subscription.is_active());

        drop(subscription);
        store.send(CounterAction::Add(1)).wait().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[test]
    fn test_store_from_plain_thread_with_runtime_option() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store: Store<Counter, CounterAction> = Store::with_options(
            Counter::default(),
            reducer,
            (),
            StoreOptions::new()
                .scheduler(ActionScheduler::new())
                .runtime(runtime.handle().clone()),
        );

        runtime.block_on(store.send(CounterAction::Add(4)).wait()).unwrap();
        assert_eq!(store.state().count, 4);
    }
}
