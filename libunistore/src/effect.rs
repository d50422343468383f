//! Effects: deferred producers of follow-up actions
//!
//! An [`Effect`] is a value describing asynchronous work. Building one runs
//! nothing; the store polls it after the reducer returns, and every action it
//! yields is dispatched back through the store. Failures travel as
//! [`EffectError`] until a [`catch`](Effect::catch) turns them into actions.

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::EffectError;

/// Callback invoked once an effect has delivered all of its output
pub type Completion = Box<dyn FnOnce(Result<(), EffectError>) + Send + 'static>;

/// Deferred, asynchronous producer of zero or more actions
pub enum Effect<A> {
    /// Produces nothing
    None,
    /// Produces at most one action
    Future(BoxFuture<'static, Result<Option<A>, EffectError>>),
    /// Produces any number of actions
    Stream(BoxStream<'static, Result<A, EffectError>>),
    /// Runs inner effects concurrently; outputs interleave by completion order
    Merge(Vec<Effect<A>>),
    /// Inner effect plus a callback fired when it is exhausted
    Completing {
        inner: Box<Effect<A>>,
        on_complete: Completion,
    },
}

impl<A> std::fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Future(_) => write!(f, "Effect::Future(..)"),
            Effect::Stream(_) => write!(f, "Effect::Stream(..)"),
            Effect::Merge(effects) => f.debug_tuple("Effect::Merge").field(effects).finish(),
            Effect::Completing { inner, .. } => {
                f.debug_struct("Effect::Completing").field("inner", inner).finish()
            }
        }
    }
}

impl<A> Default for Effect<A> {
    fn default() -> Self {
        Effect::None
    }
}

impl<A: Send + 'static> Effect<A> {
    pub fn none() -> Self {
        Effect::None
    }

    /// Immediately produce `action`
    pub fn send(action: A) -> Self {
        Effect::Future(future::ready(Ok(Some(action))).boxed())
    }

    /// Produce the action returned by an infallible future
    pub fn future<F>(fut: F) -> Self
    where
        F: Future<Output = A> + Send + 'static,
    {
        Effect::Future(fut.map(|action| Ok(Some(action))).boxed())
    }

    /// Produce the action returned by a fallible future
    ///
    /// An `Err` is an uncaught effect failure unless a [`catch`](Self::catch)
    /// is applied.
    pub fn task<F, E>(fut: F) -> Self
    where
        F: Future<Output = std::result::Result<A, E>> + Send + 'static,
        E: Into<EffectError>,
    {
        Effect::Future(fut.map(|result| result.map(Some).map_err(Into::into)).boxed())
    }

    /// Run work whose outcome produces no action
    pub fn fire_and_forget<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Effect::Future(fut.map(|_| Ok(None)).boxed())
    }

    /// Produce every item of `items`
    pub fn stream<S>(items: S) -> Self
    where
        S: Stream<Item = A> + Send + 'static,
    {
        Effect::Stream(items.map(Ok).boxed())
    }

    /// Combine effects into one. No-op effects are dropped.
    pub fn merge<I>(effects: I) -> Self
    where
        I: IntoIterator<Item = Effect<A>>,
    {
        let mut effects: Vec<Effect<A>> = effects.into_iter().filter(|e| !e.is_none()).collect();
        match effects.len() {
            0 => Effect::None,
            1 => effects.remove(0),
            _ => Effect::Merge(effects),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }

    /// Transform every produced action
    pub fn map<B, F>(self, f: F) -> Effect<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.map_shared(Arc::new(f))
    }

    pub(crate) fn map_shared<B>(self, f: Arc<dyn Fn(A) -> B + Send + Sync>) -> Effect<B>
    where
        B: Send + 'static,
    {
        match self {
            Effect::None => Effect::None,
            Effect::Future(fut) => {
                Effect::Future(fut.map(move |result| result.map(|action| action.map(|a| f(a)))).boxed())
            }
            Effect::Stream(items) => {
                Effect::Stream(items.map(move |result| result.map(|a| f(a))).boxed())
            }
            Effect::Merge(effects) => Effect::Merge(
                effects
                    .into_iter()
                    .map(|effect| effect.map_shared(f.clone()))
                    .collect(),
            ),
            Effect::Completing { inner, on_complete } => Effect::Completing {
                inner: Box::new(inner.map_shared(f)),
                on_complete,
            },
        }
    }

    /// Replace every failure with the action `recover` builds from it
    ///
    /// The result never fails, so completion callbacks inside it always
    /// observe `Ok(())`.
    pub fn catch<F>(self, recover: F) -> Self
    where
        F: Fn(EffectError) -> A + Send + Sync + 'static,
    {
        self.catch_shared(Arc::new(recover))
    }

    fn catch_shared(self, recover: Arc<dyn Fn(EffectError) -> A + Send + Sync>) -> Self {
        match self {
            Effect::None => Effect::None,
            Effect::Future(fut) => Effect::Future(
                fut.map(move |result| match result {
                    Ok(action) => Ok(action),
                    Err(e) => Ok(Some(recover(e))),
                })
                .boxed(),
            ),
            Effect::Stream(items) => Effect::Stream(
                items
                    .map(move |result| match result {
                        Ok(action) => Ok(action),
                        Err(e) => Ok(recover(e)),
                    })
                    .boxed(),
            ),
            Effect::Merge(effects) => Effect::Merge(
                effects
                    .into_iter()
                    .map(|effect| effect.catch_shared(recover.clone()))
                    .collect(),
            ),
            Effect::Completing { inner, on_complete } => Effect::Completing {
                inner: Box::new(inner.catch_shared(recover)),
                on_complete,
            },
        }
    }

    /// Attach a callback fired exactly once, after the last output
    ///
    /// The callback receives the first failure the effect produced, if any.
    pub fn on_complete<F>(self, callback: F) -> Self
    where
        F: FnOnce(Result<(), EffectError>) + Send + 'static,
    {
        Effect::Completing {
            inner: Box::new(self),
            on_complete: Box::new(callback),
        }
    }

    /// Flatten into a single stream of outputs
    pub fn into_stream(self) -> BoxStream<'static, Result<A, EffectError>> {
        match self {
            Effect::None => stream::empty().boxed(),
            Effect::Future(fut) => stream::once(fut)
                .filter_map(|result| future::ready(result.transpose()))
                .boxed(),
            Effect::Stream(items) => items,
            Effect::Merge(effects) => {
                stream::select_all(effects.into_iter().map(Effect::into_stream)).boxed()
            }
            Effect::Completing { inner, on_complete } => {
                let state = (inner.into_stream(), Some(on_complete), None::<EffectError>);
                stream::unfold(state, |(mut items, mut callback, mut first_error)| async move {
                    match items.next().await {
                        Some(item) => {
                            if let Err(e) = &item {
                                if first_error.is_none() {
                                    first_error = Some(e.clone());
                                }
                            }
                            Some((item, (items, callback, first_error)))
                        }
                        None => {
                            if let Some(callback) = callback.take() {
                                callback(match first_error {
                                    Some(e) => Err(e),
                                    None => Ok(()),
                                });
                            }
                            None
                        }
                    }
                })
                .boxed()
            }
        }
    }
}
