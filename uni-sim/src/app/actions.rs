//! Actions for the watchlist and counter stores
//!
//! Identities are written out per variant. Search keystrokes all share one
//! identity so a burst collapses into the last query; trades are keyed by
//! symbol so taps on different instruments never throttle each other.

use libunistore::{Action, Schedule};
use std::time::Duration;

use super::state::{Quote, Trade};

/// Every state transition of the watchlist
#[derive(Debug, Clone)]
pub enum AppAction {
    // === Search ===
    /// The search box changed; released after `delay` of quiet
    QueryChanged { query: String, delay: Duration },

    /// Search results arrived
    SearchCompleted(Vec<Quote>),

    /// Search effect failed
    SearchFailed(String),

    // === Trading ===
    /// Buy (positive) or sell (negative) `quantity` shares; repeated taps
    /// inside `window` are dropped
    TradeRequested {
        symbol: String,
        quantity: i64,
        window: Duration,
    },

    /// The order executed at the quoted price
    TradeFilled(Trade),

    /// The order could not execute
    TradeFailed(String),

    // === Errors ===
    DismissError,
}

impl Action for AppAction {
    fn identity(&self) -> String {
        match self {
            AppAction::QueryChanged { .. } => "search.query_changed".to_string(),
            AppAction::SearchCompleted(_) => "search.completed".to_string(),
            AppAction::SearchFailed(_) => "search.failed".to_string(),
            AppAction::TradeRequested { symbol, .. } => format!("trade.requested.{}", symbol.to_uppercase()),
            AppAction::TradeFilled(_) => "trade.filled".to_string(),
            AppAction::TradeFailed(_) => "trade.failed".to_string(),
            AppAction::DismissError => "error.dismiss".to_string(),
        }
    }

    fn schedule(&self) -> Schedule {
        match self {
            AppAction::QueryChanged { delay, .. } => Schedule::Debounce(*delay),
            AppAction::TradeRequested { window, .. } => Schedule::Throttle(*window),
            _ => Schedule::Immediate,
        }
    }
}

/// Writes accepted by the portfolio view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortfolioAction {
    /// Sell part of a position
    Sell { symbol: String, quantity: i64 },
    /// Sell a position entirely
    Close { symbol: String, shares: i64 },
}

/// Counter scenario actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    Inc,
}

/// Throttle window of the counter's increment button
pub const INCREMENT_WINDOW: Duration = Duration::from_secs(1);

impl Action for CounterAction {
    fn identity(&self) -> String {
        match self {
            CounterAction::Inc => "inc".to_string(),
        }
    }

    fn schedule(&self) -> Schedule {
        match self {
            CounterAction::Inc => Schedule::Throttle(INCREMENT_WINDOW),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_keystrokes_share_identity() {
        let first = AppAction::QueryChanged {
            query: "a".into(),
            delay: Duration::from_millis(300),
        };
        let second = AppAction::QueryChanged {
            query: "ap".into(),
            delay: Duration::from_millis(300),
        };
        assert_eq!(first.identity(), second.identity());
        assert_eq!(first.schedule(), Schedule::Debounce(Duration::from_millis(300)));
    }

    #[test]
    fn test_trade_identity_is_per_symbol() {
        let trade = |symbol: &str| AppAction::TradeRequested {
            symbol: symbol.to_string(),
            quantity: 1,
            window: Duration::from_secs(1),
        };
        assert_eq!(trade("AAPL").identity(), trade("AAPL").identity());
        assert_ne!(trade("AAPL").identity(), trade("MSFT").identity());
        // Symbols are case-insensitive everywhere else
        assert_eq!(trade("aapl").identity(), trade("AAPL").identity());
    }

    #[test]
    fn test_increment_is_throttled_under_inc() {
        assert_eq!(CounterAction::Inc.identity(), "inc");
        assert_eq!(CounterAction::Inc.schedule(), Schedule::Throttle(INCREMENT_WINDOW));
    }
}
