//! Action identity and dispatch scheduling
//!
//! Every action type dispatched on a root store implements [`Action`]. The
//! identity string is the key the [`ActionScheduler`](crate::scheduler::ActionScheduler)
//! coalesces on, so logically-equivalent requests must map to the same
//! string. Implementations write it as an exhaustive `match`:
//!
//! ```
//! use libunistore::{Action, Schedule};
//! use std::time::Duration;
//!
//! enum SearchAction {
//!     QueryChanged(String),
//!     ResultsLoaded(Vec<String>),
//! }
//!
//! impl Action for SearchAction {
//!     fn identity(&self) -> String {
//!         match self {
//!             SearchAction::QueryChanged(_) => "search.query_changed".to_string(),
//!             SearchAction::ResultsLoaded(_) => "search.results_loaded".to_string(),
//!         }
//!     }
//!
//!     fn schedule(&self) -> Schedule {
//!         match self {
//!             SearchAction::QueryChanged(_) => Schedule::Debounce(Duration::from_millis(300)),
//!             SearchAction::ResultsLoaded(_) => Schedule::Immediate,
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

/// How a dispatched action is released to the reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Reduce as soon as the store's context picks it up
    Immediate,
    /// Wait `delay`; a newer action with the same identity replaces this one
    Debounce(Duration),
    /// Reduce now, then drop same-identity actions for the window
    Throttle(Duration),
}

/// A dispatchable action with a stable identity
pub trait Action: Send + 'static {
    /// Deterministic identity of the logical request this action represents
    fn identity(&self) -> String;

    /// Scheduling policy applied by the root store's dispatch
    fn schedule(&self) -> Schedule {
        Schedule::Immediate
    }
}
