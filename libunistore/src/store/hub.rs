//! Latest-state cell plus its observers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) type Observer<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Registered<S> {
    id: u64,
    active: Arc<AtomicBool>,
    observer: Observer<S>,
}

struct HubState<S> {
    current: S,
    observers: Vec<Registered<S>>,
    next_id: u64,
}

/// Holds a store's published state and notifies observers of replacements
///
/// Observers are invoked outside the lock, so they may read the store or
/// dispatch without deadlocking. Each observer's flag is re-read right
/// before its call: once `detach` has returned, that observer is not
/// started again, though a call already in progress runs to the end.
pub(crate) struct Hub<S> {
    state: Mutex<HubState<S>>,
}

impl<S: Clone> Hub<S> {
    pub(crate) fn new(initial: S) -> Self {
        Self {
            state: Mutex::new(HubState {
                current: initial,
                observers: Vec::new(),
                next_id: 0,
            }),
        }
    }

    pub(crate) fn snapshot(&self) -> S {
        self.lock().current.clone()
    }

    /// Replace the state and notify every observer
    pub(crate) fn publish(&self, next: S) {
        let observers = {
            let mut state = self.lock();
            state.current = next.clone();
            Self::active_observers(&state)
        };
        Self::notify(observers, &next);
    }

    /// Hand out an id for an observer that will be attached later
    pub(crate) fn reserve(&self) -> u64 {
        let mut state = self.lock();
        state.next_id += 1;
        state.next_id
    }

    /// Register `observer` and call it with the current state
    ///
    /// Skipped if the subscription was cancelled before it got attached.
    pub(crate) fn attach(&self, id: u64, active: Arc<AtomicBool>, observer: Observer<S>) {
        let current = {
            let mut state = self.lock();
            if !active.load(Ordering::SeqCst) {
                return;
            }
            state.observers.push(Registered {
                id,
                active,
                observer: observer.clone(),
            });
            state.current.clone()
        };
        observer(&current);
    }

    pub(crate) fn detach(&self, id: u64, active: &AtomicBool) {
        let mut state = self.lock();
        active.store(false, Ordering::SeqCst);
        state.observers.retain(|registered| registered.id != id);
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    fn active_observers(state: &HubState<S>) -> Vec<(Arc<AtomicBool>, Observer<S>)> {
        state
            .observers
            .iter()
            .filter(|registered| registered.active.load(Ordering::SeqCst))
            .map(|registered| (registered.active.clone(), registered.observer.clone()))
            .collect()
    }

    fn notify(observers: Vec<(Arc<AtomicBool>, Observer<S>)>, next: &S) {
        for (active, observer) in observers {
            if active.load(Ordering::SeqCst) {
                observer(next);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState<S>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: Clone + PartialEq> Hub<S> {
    /// Publish only if `next` differs from the current state
    ///
    /// Returns whether observers were notified.
    pub(crate) fn publish_if_changed(&self, next: S) -> bool {
        let observers = {
            let mut state = self.lock();
            if state.current == next {
                return false;
            }
            state.current = next.clone();
            Self::active_observers(&state)
        };
        Self::notify(observers, &next);
        true
    }
}
