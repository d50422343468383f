//! Derived stores: read projections with forwarded writes
//!
//! A derived store has no reducer and no state of its own to mutate. Its
//! state is a projection of the parent's, recomputed on every parent change
//! and republished only when the projected value changed. Its dispatch maps
//! the action into the parent's action type and forwards it, so every write
//! goes through the root reducer.
//!
//! ```no_run
//! use libunistore::{Action, Effect, Store};
//!
//! #[derive(Clone, Default)]
//! struct App { user: Option<String>, unread: u32 }
//!
//! enum AppAction { SignOut, MarkRead }
//! enum InboxAction { MarkRead }
//!
//! impl Action for AppAction {
//!     fn identity(&self) -> String {
//!         match self {
//!             AppAction::SignOut => "app.sign_out".to_string(),
//!             AppAction::MarkRead => "app.mark_read".to_string(),
//!         }
//!     }
//! }
//!
//! # async fn example() {
//! let store = Store::new(App::default(), |s: App, a: AppAction, _: &()| match a {
//!     AppAction::SignOut => (App { user: None, ..s }, Effect::none()),
//!     AppAction::MarkRead => (App { unread: 0, ..s }, Effect::none()),
//! }, ());
//!
//! let inbox = store.derived(
//!     |app: &App| app.unread,
//!     |action: InboxAction| match action {
//!         InboxAction::MarkRead => AppAction::MarkRead,
//!     },
//!     (),
//! );
//! inbox.send(InboxAction::MarkRead).wait().await.unwrap();
//! assert_eq!(inbox.state(), 0);
//! # }
//! ```

use std::sync::Arc;

use super::chain::Chain;
use super::hub::Hub;
use super::{Forward, Store};

/// Write path of a derived store: translate, then hand to the parent
struct Mapped<DA, PA> {
    parent: Arc<dyn Forward<PA>>,
    map: Box<dyn Fn(DA) -> PA + Send + Sync>,
}

impl<DA, PA> Forward<DA> for Mapped<DA, PA> {
    fn forward(&self, action: DA, chain: Arc<Chain>) {
        self.parent.forward((self.map)(action), chain);
    }
}

impl<S, A, E> Store<S, A, E>
where
    S: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    /// Build a store viewing `project(state)` whose actions are translated
    /// by `map_action` and dispatched on this store
    ///
    /// Observers of the derived store are only notified when the projection
    /// changes by value. The derived store can itself be derived again.
    pub fn derived<DS, DA, DE, P, M>(&self, project: P, map_action: M, env: DE) -> Store<DS, DA, DE>
    where
        DS: Clone + PartialEq + Send + Sync + 'static,
        DA: Send + 'static,
        DE: Send + Sync + 'static,
        P: Fn(&S) -> DS + Send + Sync + 'static,
        M: Fn(DA) -> A + Send + Sync + 'static,
    {
        let hub = Arc::new(Hub::new(project(&self.state())));

        let upstream = {
            let hub = hub.clone();
            self.subscribe(move |parent: &S| {
                hub.publish_if_changed(project(parent));
            })
        };

        Store {
            sink: Arc::new(Mapped {
                parent: self.sink.clone(),
                map: Box::new(map_action),
            }),
            hub,
            context: self.context.clone(),
            env: Arc::new(env),
            upstream: Some(Arc::new(upstream)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::scheduler::ActionScheduler;
    use crate::store::StoreOptions;
    use crate::{Action, Effect, Store};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Profile {
        name: String,
        visits: u32,
    }

    #[derive(Debug, Clone)]
    enum ProfileAction {
        Rename(String),
        Visit,
    }

    impl Action for ProfileAction {
        fn identity(&self) -> String {
            match self {
                ProfileAction::Rename(_) => "profile.rename".to_string(),
                ProfileAction::Visit => "profile.visit".to_string(),
            }
        }
    }

    fn reducer(state: Profile, action: ProfileAction, _env: &()) -> (Profile, Effect<ProfileAction>) {
        match action {
            ProfileAction::Rename(name) => (Profile { name, ..state }, Effect::none()),
            ProfileAction::Visit => (Profile { visits: state.visits + 1, ..state }, Effect::none()),
        }
    }

    fn store() -> Store<Profile, ProfileAction> {
        Store::with_options(
            Profile::default(),
            reducer,
            (),
            StoreOptions::new().scheduler(ActionScheduler::new()),
        )
    }

    #[tokio::test]
    async fn test_derived_state_tracks_projection() {
        let store = store();
        let name = store.derived(|p: &Profile| p.name.clone(), ProfileAction::Rename, ());
        assert!(!name.is_root());

        name.send("ada".to_string()).wait().await.unwrap();
        assert_eq!(name.state(), "ada");
        assert_eq!(store.state().name, "ada");
    }

    #[tokio::test]
    async fn test_derived_observers_skip_unchanged_projection() {
        let store = store();
        let name = store.derived(|p: &Profile| p.name.clone(), ProfileAction::Rename, ());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = name.subscribe(move |n: &String| sink.lock().unwrap().push(n.clone()));

        store.send(ProfileAction::Visit).wait().await.unwrap();
        store.send(ProfileAction::Rename("grace".to_string())).wait().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["".to_string(), "grace".to_string()]);
    }

    #[tokio::test]
    async fn test_dropping_derived_store_detaches_from_parent() {
        let store = store();
        let visits = store.derived(|p: &Profile| p.visits, |_: ()| ProfileAction::Visit, ());
        store.send(ProfileAction::Visit).wait().await.unwrap();
        assert_eq!(visits.state(), 1);

        drop(visits);
        store.send(ProfileAction::Visit).wait().await.unwrap();
        assert_eq!(store.hub.observer_count(), 0);
    }
}
