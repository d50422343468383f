//! Debounce and throttle keyed by action identity
//!
//! The scheduler holds one slot per identity string. A slot is either a
//! pending debounce unit (a Tokio task waiting out its delay) or a throttle
//! window. Every handle cloned from the same scheduler, including
//! [`scoped`](ActionScheduler::scoped) views, shares one table.
//!
//! # Shared namespace
//!
//! [`ActionScheduler::shared`] is the process-wide instance. Identities
//! registered on it collide across features: two unrelated actions that
//! compute the same identity string cancel or drop each other. Stores avoid
//! this by scoping their identities (see `StoreOptions::isolate`).
//!
//! Debounced work runs on the Tokio runtime, so [`debounce`](ActionScheduler::debounce)
//! must be called from inside one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

enum Slot {
    /// Debounced work waiting for its delay to elapse
    Pending { generation: u64, handle: JoinHandle<()> },
    /// Throttle window; arrivals before `until` are dropped
    Busy { until: Instant },
}

#[derive(Default)]
struct Table {
    slots: HashMap<String, Slot>,
    next_generation: u64,
}

impl Table {
    /// Forget throttle windows that have closed
    fn sweep(&mut self, now: Instant) {
        self.slots
            .retain(|_, slot| !matches!(slot, Slot::Busy { until } if now >= *until));
    }
}

/// Keyed debounce/throttle service
#[derive(Clone)]
pub struct ActionScheduler {
    table: Arc<Mutex<Table>>,
    namespace: Option<Arc<str>>,
}

impl std::fmt::Debug for ActionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionScheduler")
            .field("namespace", &self.namespace)
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Default for ActionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionScheduler {
    /// Create an isolated scheduler with its own table
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table::default())),
            namespace: None,
        }
    }

    /// The process-wide scheduler
    ///
    /// Lives for the whole process. Tests that use it should call
    /// [`reset`](Self::reset) first.
    pub fn shared() -> ActionScheduler {
        static SHARED: OnceLock<ActionScheduler> = OnceLock::new();
        SHARED.get_or_init(ActionScheduler::new).clone()
    }

    /// A view on the same table whose ids are prefixed with `namespace`
    pub fn scoped(&self, namespace: &str) -> ActionScheduler {
        let namespace = match &self.namespace {
            Some(outer) => format!("{}/{}", outer, namespace),
            None => namespace.to_string(),
        };
        Self {
            table: self.table.clone(),
            namespace: Some(namespace.into()),
        }
    }

    /// Run `work` after `delay`, replacing any unit pending under `id`
    pub fn debounce<F>(&self, id: &str, delay: Duration, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let key = self.key(id);
        let mut table = self.lock();
        table.next_generation += 1;
        let generation = table.next_generation;

        let handle = {
            let table = self.table.clone();
            let key = key.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let released = {
                    let mut table = lock_table(&table);
                    match table.slots.get(&key) {
                        Some(Slot::Pending { generation: current, .. }) if *current == generation => {
                            table.slots.remove(&key);
                            true
                        }
                        _ => false,
                    }
                };
                if released {
                    trace!(id = %key, "Debounced unit released");
                    work();
                }
            })
        };

        if let Some(Slot::Pending { handle: previous, .. }) =
            table.slots.insert(key.clone(), Slot::Pending { generation, handle })
        {
            debug!(id = %key, "Debounce superseded pending unit");
            previous.abort();
        }
    }

    /// Run `work` now unless `id` is inside a throttle window or has a
    /// pending debounce unit; dropped calls leave no trace
    pub fn throttle<F>(&self, id: &str, delay: Duration, work: F)
    where
        F: FnOnce(),
    {
        let key = self.key(id);
        {
            let mut table = self.lock();
            let now = Instant::now();
            table.sweep(now);
            let busy = match table.slots.get(&key) {
                Some(Slot::Pending { .. }) => true,
                Some(Slot::Busy { until }) => now < *until,
                None => false,
            };
            if busy {
                debug!(id = %key, "Throttled call dropped");
                return;
            }
            table.slots.insert(key, Slot::Busy { until: now + delay });
        }
        work();
    }

    /// Cancel every pending unit and forget every throttle window
    ///
    /// Clears the whole table, including ids of other scoped views.
    pub fn reset(&self) {
        let mut table = self.lock();
        for (_, slot) in table.slots.drain() {
            if let Slot::Pending { handle, .. } = slot {
                handle.abort();
            }
        }
    }

    /// Number of live slots: pending debounce units and open throttle windows
    pub fn pending_count(&self) -> usize {
        let mut table = self.lock();
        table.sweep(Instant::now());
        table.slots.len()
    }

    fn key(&self, id: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}::{}", namespace, id),
            None => id.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        lock_table(&self.table)
    }
}

fn lock_table(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    // Slots stay consistent even if a holder panicked; work never runs under the lock
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
