//! Application module
//!
//! - Actions: what can happen
//! - State: what is true right now
//! - Reducer: `(State, Action, Env) -> (State, Effect)`
//!
//! plus the store constructors wiring them to the core.

pub mod actions;
pub mod reducer;
pub mod state;

use libunistore::{Store, StoreOptions};
use std::time::Duration;

use crate::services::SimEnv;

// Re-export commonly used types
pub use actions::{AppAction, CounterAction, PortfolioAction};
pub use reducer::{count, reduce};
pub use state::{AppState, CounterState, Portfolio, Quote, Trade};

pub type AppStore = Store<AppState, AppAction, SimEnv>;

/// Root watchlist store
pub fn app_store(env: SimEnv, options: StoreOptions) -> AppStore {
    Store::with_options(AppState::new(), reduce, env, options)
}

/// Root counter store
pub fn counter_store(options: StoreOptions) -> Store<CounterState, CounterAction> {
    Store::with_options(CounterState::default(), count, (), options)
}

/// Portfolio view over the watchlist
///
/// Sells become throttled trade requests on the root store, so a sell
/// tapped twice inside `window` executes once.
pub fn portfolio_view(store: &AppStore, window: Duration) -> Store<Portfolio, PortfolioAction> {
    store.derived(
        AppState::portfolio,
        move |action: PortfolioAction| match action {
            PortfolioAction::Sell { symbol, quantity } => AppAction::TradeRequested {
                symbol,
                quantity: -quantity,
                window,
            },
            PortfolioAction::Close { symbol, shares } => AppAction::TradeRequested {
                symbol,
                quantity: -shares,
                window,
            },
        },
        (),
    )
}
