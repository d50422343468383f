//! Application state
//!
//! Plain values replaced wholesale by the reducer. Everything serializes so
//! scenario reports can print it as JSON.

use serde::Serialize;
use std::collections::BTreeMap;

/// Starting cash for every simulation, in cents
pub const STARTING_CASH_CENTS: i64 = 10_000_00;

/// A listed instrument and its last price
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price_cents: i64,
}

/// An executed buy (positive quantity) or sell (negative quantity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub symbol: String,
    pub quantity: i64,
    pub price_cents: i64,
}

/// Root state of the watchlist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    /// Query of the last search that reached the reducer
    pub query: String,

    /// Results of the last completed search
    pub results: Vec<Quote>,

    /// A search effect is in flight
    pub searching: bool,

    /// Shares held per symbol
    pub holdings: BTreeMap<String, i64>,

    /// Last known price per symbol
    pub prices: BTreeMap<String, i64>,

    pub cash_cents: i64,

    /// Executed trades, oldest first
    pub trades: Vec<Trade>,

    /// Error shown to the user until dismissed
    pub error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
            searching: false,
            holdings: BTreeMap::new(),
            prices: BTreeMap::new(),
            cash_cents: STARTING_CASH_CENTS,
            trades: Vec::new(),
            error: None,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projection used by the portfolio view
    pub fn portfolio(&self) -> Portfolio {
        let positions: Vec<Position> = self
            .holdings
            .iter()
            .filter(|(_, shares)| **shares != 0)
            .map(|(symbol, shares)| {
                let price_cents = self.prices.get(symbol).copied().unwrap_or(0);
                Position {
                    symbol: symbol.clone(),
                    shares: *shares,
                    value_cents: shares.saturating_mul(price_cents),
                }
            })
            .collect();
        let holdings_cents = positions.iter().fold(0i64, |sum, p| sum.saturating_add(p.value_cents));

        Portfolio {
            positions,
            cash_cents: self.cash_cents,
            total_cents: self.cash_cents.saturating_add(holdings_cents),
        }
    }
}

/// One non-empty holding at its last known price
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub shares: i64,
    pub value_cents: i64,
}

/// Read-only portfolio summary derived from [`AppState`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Portfolio {
    pub positions: Vec<Position>,
    pub cash_cents: i64,
    pub total_cents: i64,
}

/// Root state of the counter scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterState {
    pub count: u64,
}
