//! Scripted scenarios driving the stores the way a UI would
//!
//! Each scenario dispatches a burst of actions with a fixed gap between
//! them, waits for every dispatch chain to settle, and returns a report of
//! the final state. Timing goes through `tokio::time`, so tests can run the
//! scenarios on a paused clock.

use libunistore::{Config, DispatchHandle, StoreOptions};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::app::{self, AppAction, Portfolio, PortfolioAction, Quote, Trade};
use crate::error::{Result, SimError};
use crate::services::{FixtureQuotes, SimEnv};

/// Timing and service settings shared by all scenarios
#[derive(Debug, Clone)]
pub struct SimSettings {
    pub debounce: Duration,
    pub throttle: Duration,
    pub cache_lifetime: Duration,
    pub latency: Duration,
    pub offline: bool,
    pub store_options: StoreOptions,
}

impl SimSettings {
    /// Read delays and the cache lifetime from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            debounce: config.scheduler.debounce_delay()?,
            throttle: config.scheduler.throttle_window()?,
            cache_lifetime: config.cache.lifetime()?,
            latency: Duration::from_millis(80),
            offline: false,
            store_options: StoreOptions::from_config(&config.scheduler),
        })
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    fn environment(&self) -> (SimEnv, Arc<FixtureQuotes>) {
        let fixture = Arc::new(FixtureQuotes::new(self.latency).offline(self.offline));
        (SimEnv::new(fixture.clone(), self.cache_lifetime), fixture)
    }
}

#[derive(Debug, Serialize)]
pub struct CounterReport {
    pub presses: u32,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub keystrokes: usize,
    pub results: Vec<Quote>,
    /// Requests that reached the quote service
    pub service_calls: usize,
    /// State notifications seen by the results list
    pub renders: usize,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TradeReport {
    pub symbol: String,
    pub taps: u32,
    pub trades: Vec<Trade>,
    pub portfolio: Portfolio,
    /// Notifications seen by the portfolio view
    pub portfolio_updates: usize,
    pub service_calls: usize,
    pub error: Option<String>,
}

/// Press the throttled increment button `presses` times, `gap` apart
pub async fn counter(settings: &SimSettings, presses: u32, gap: Duration) -> Result<CounterReport> {
    let store = app::counter_store(settings.store_options.clone());

    let mut handles = Vec::with_capacity(presses as usize);
    for press in 0..presses {
        if press > 0 {
            tokio::time::sleep(gap).await;
        }
        handles.push(store.send(app::CounterAction::Inc));
    }
    settle(handles).await?;

    let count = store.state().count;
    info!(presses, count, "Counter scenario finished");
    Ok(CounterReport { presses, count })
}

/// Type `query` one character at a time, `gap` apart
pub async fn search(settings: &SimSettings, query: &str, gap: Duration) -> Result<SearchReport> {
    if query.is_empty() {
        return Err(SimError::InvalidInput("search query cannot be empty".to_string()));
    }

    let (env, fixture) = settings.environment();
    let store = app::app_store(env, settings.store_options.clone());

    let renders = Arc::new(AtomicUsize::new(0));
    let results = store.derived(|state: &app::AppState| state.results.clone(), |a: AppAction| a, ());
    let _subscription = {
        let renders = renders.clone();
        results.subscribe(move |_: &Vec<Quote>| {
            renders.fetch_add(1, Ordering::SeqCst);
        })
    };

    let mut handles = Vec::new();
    let mut typed = String::new();
    for (i, c) in query.chars().enumerate() {
        if i > 0 {
            tokio::time::sleep(gap).await;
        }
        typed.push(c);
        debug!(query = %typed, "Keystroke");
        handles.push(store.send(AppAction::QueryChanged {
            query: typed.clone(),
            delay: settings.debounce,
        }));
    }
    let keystrokes = handles.len();
    settle(handles).await?;

    let state = store.state();
    info!(query, results = state.results.len(), calls = fixture.calls(), "Search scenario finished");
    Ok(SearchReport {
        query: state.query,
        keystrokes,
        results: state.results,
        service_calls: fixture.calls(),
        renders: renders.load(Ordering::SeqCst),
        error: state.error,
    })
}

/// Tap buy `taps` times, `gap` apart, then sell `sell` shares through the
/// portfolio view once the throttle window has passed
pub async fn trade(
    settings: &SimSettings,
    symbol: &str,
    quantity: i64,
    taps: u32,
    sell: i64,
    gap: Duration,
) -> Result<TradeReport> {
    if quantity <= 0 {
        return Err(SimError::InvalidInput(format!("quantity must be positive, got {}", quantity)));
    }

    let (env, fixture) = settings.environment();
    let store = app::app_store(env, settings.store_options.clone());
    let portfolio = app::portfolio_view(&store, settings.throttle);

    let updates = Arc::new(AtomicUsize::new(0));
    let _subscription = {
        let updates = updates.clone();
        portfolio.subscribe(move |_: &Portfolio| {
            updates.fetch_add(1, Ordering::SeqCst);
        })
    };

    let mut handles = Vec::with_capacity(taps as usize);
    for tap in 0..taps {
        if tap > 0 {
            tokio::time::sleep(gap).await;
        }
        handles.push(store.send(AppAction::TradeRequested {
            symbol: symbol.to_string(),
            quantity,
            window: settings.throttle,
        }));
    }
    settle(handles).await?;

    if sell > 0 {
        tokio::time::sleep(settings.throttle).await;
        portfolio
            .send(PortfolioAction::Sell {
                symbol: symbol.to_string(),
                quantity: sell,
            })
            .wait()
            .await?;
    }

    let state = store.state();
    info!(symbol, trades = state.trades.len(), "Trade scenario finished");
    Ok(TradeReport {
        symbol: symbol.to_uppercase(),
        taps,
        trades: state.trades,
        portfolio: portfolio.state(),
        portfolio_updates: updates.load(Ordering::SeqCst),
        service_calls: fixture.calls(),
        error: state.error,
    })
}

async fn settle(handles: Vec<DispatchHandle>) -> Result<()> {
    for handle in handles {
        handle.wait().await?;
    }
    Ok(())
}
