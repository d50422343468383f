//! Completion tracking for a dispatch and everything it causes
//!
//! Each unit of work spawned by a root dispatch (the scheduled action, the
//! queued reducer run, the running effect, every follow-up action) holds an
//! `Arc<Chain>`. When the last one is dropped the chain has settled and the
//! completion callback fires with the first uncaught effect failure. Actions
//! dropped by the scheduler release their reference without running, which
//! is why a throttled or superseded dispatch completes with `Ok(())`.
//!
//! A chain whose reducer panicked, or whose action reached a stopped store,
//! completes with [`EffectError::StoreStopped`] instead.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::effect::Completion;
use crate::error::EffectError;

pub(crate) struct Chain {
    first_failure: Mutex<Option<EffectError>>,
    on_complete: Mutex<Option<Completion>>,
}

impl Chain {
    pub(crate) fn new(on_complete: Option<Completion>) -> Arc<Self> {
        Arc::new(Self {
            first_failure: Mutex::new(None),
            on_complete: Mutex::new(on_complete),
        })
    }

    /// Record an uncaught effect failure; only the first one is reported
    pub(crate) fn fail(&self, error: EffectError) {
        let mut first = self
            .first_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if first.is_none() {
            *first = Some(error);
        }
    }
}

/// Marks the chain failed if the reducer unwinds while it is held
pub(crate) struct Reducing<'a>(pub(crate) &'a Chain);

impl Drop for Reducing<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.fail(EffectError::StoreStopped("reducer panicked".to_string()));
        }
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.fail(EffectError::StoreStopped("dropped while unwinding".to_string()));
        }
        let callback = self
            .on_complete
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(callback) = callback {
            let failure = self
                .first_failure
                .get_mut()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take();
            callback(match failure {
                Some(error) => Err(error),
                None => Ok(()),
            });
        }
    }
}

/// Awaitable completion of a dispatch
///
/// Returned by [`Store::send`](super::Store::send).
#[must_use = "a DispatchHandle does nothing unless awaited with `wait`"]
pub struct DispatchHandle {
    rx: oneshot::Receiver<Result<(), EffectError>>,
}

impl DispatchHandle {
    pub(crate) fn new() -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        let completion: Completion = Box::new(move |result| {
            let _ = tx.send(result);
        });
        (Self { rx }, completion)
    }

    /// Wait until the dispatch and all of its follow-up effects settled
    pub async fn wait(self) -> Result<(), EffectError> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(EffectError::StoreStopped("completion never reported".to_string())))
    }
}
