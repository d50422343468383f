//! uni-sim library
//!
//! Watchlist and counter applications built on libunistore, plus the
//! scripted scenarios the `uni-sim` binary runs.

pub mod app;
pub mod error;
pub mod scenario;
pub mod services;

// Re-export commonly used types
pub use app::{AppAction, AppState, AppStore, PortfolioAction};
pub use error::{Result, SimError};
pub use scenario::SimSettings;
pub use services::{FixtureQuotes, QuoteService, SimEnv};
