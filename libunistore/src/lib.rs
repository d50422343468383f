//! Unistore - unidirectional state management on Tokio
//!
//! State lives in a [`Store`] and changes only by dispatching actions through
//! a pure [`Reducer`]. Side effects are returned from the reducer as
//! [`Effect`] values, run asynchronously, and feed their results back as
//! new actions. Repeated actions can be debounced or throttled by identity
//! through the [`ActionScheduler`], and short-lived fetch results can be
//! kept in a [`TtlCache`].

pub mod action;
pub mod cache;
pub mod config;
pub mod effect;
pub mod error;
pub mod logging;
pub mod reducer;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use action::{Action, Schedule};
pub use cache::{CacheEvent, TtlCache};
pub use config::Config;
pub use effect::Effect;
pub use error::{EffectError, Result, UnistoreError};
pub use reducer::{combine, pullback, Reducer};
pub use scheduler::ActionScheduler;
pub use store::{DispatchHandle, Store, StoreOptions, Subscription};
