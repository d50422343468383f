//! Quote service and the environment handed to the reducer
//!
//! # Architecture
//!
//! - [`QuoteService`]: async boundary to market data
//! - [`FixtureQuotes`]: in-process implementation with a fixed listing and
//!   simulated latency, optionally offline
//! - [`SimEnv`]: the service plus the TTL caches effects fetch through

use async_trait::async_trait;
use libunistore::{EffectError, TtlCache};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::app::state::Quote;

/// Market data source
#[async_trait]
pub trait QuoteService: Send + Sync {
    /// Instruments whose symbol or name contains `query` (case-insensitive)
    async fn search(&self, query: &str) -> Result<Vec<Quote>, EffectError>;

    /// Current quote for `symbol`
    async fn quote(&self, symbol: &str) -> Result<Quote, EffectError>;
}

const LISTING: &[(&str, &str, i64)] = &[
    ("AAPL", "Apple Inc.", 189_25),
    ("AMZN", "Amazon.com Inc.", 178_10),
    ("GOOG", "Alphabet Inc.", 141_80),
    ("MSFT", "Microsoft Corp.", 415_50),
    ("NVDA", "NVIDIA Corp.", 880_00),
    ("TSLA", "Tesla Inc.", 175_30),
];

/// Fixed listing served with artificial latency
#[derive(Debug)]
pub struct FixtureQuotes {
    latency: Duration,
    offline: bool,
    calls: AtomicUsize,
}

impl FixtureQuotes {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            offline: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every request with a network error
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Number of requests served so far, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn roundtrip(&self) -> Result<(), EffectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if self.offline {
            return Err(EffectError::Network("quote service unreachable".to_string()));
        }
        Ok(())
    }
}

fn to_quote(&(symbol, name, price_cents): &(&str, &str, i64)) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        name: name.to_string(),
        price_cents,
    }
}

#[async_trait]
impl QuoteService for FixtureQuotes {
    async fn search(&self, query: &str) -> Result<Vec<Quote>, EffectError> {
        self.roundtrip().await?;
        let needle = query.to_lowercase();
        let results: Vec<Quote> = LISTING
            .iter()
            .filter(|(symbol, name, _)| {
                symbol.to_lowercase().contains(&needle) || name.to_lowercase().contains(&needle)
            })
            .map(to_quote)
            .collect();
        debug!(query, hits = results.len(), "Search served");
        Ok(results)
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, EffectError> {
        self.roundtrip().await?;
        LISTING
            .iter()
            .find(|(listed, _, _)| listed.eq_ignore_ascii_case(symbol))
            .map(to_quote)
            .ok_or_else(|| EffectError::failed(format!("unknown symbol {}", symbol)))
    }
}

/// Dependencies available to the watchlist reducer
#[derive(Clone)]
pub struct SimEnv {
    pub quotes: Arc<dyn QuoteService>,
    /// Search results keyed by lowercased query
    pub searches: TtlCache<String, Vec<Quote>>,
    /// Quotes keyed by uppercased symbol
    pub prices: TtlCache<String, Quote>,
}

impl SimEnv {
    pub fn new(quotes: Arc<dyn QuoteService>, lifetime: Duration) -> Self {
        Self {
            quotes,
            searches: TtlCache::new(lifetime),
            prices: TtlCache::new(lifetime),
        }
    }

    /// Search through the cache; only successful results are cached
    pub async fn search(&self, query: &str) -> Result<Vec<Quote>, EffectError> {
        let quotes = self.quotes.clone();
        let owned = query.to_string();
        self.searches
            .fetch_or_insert(query.to_lowercase(), async move { quotes.search(&owned).await })
            .await
    }

    /// Quote through the cache
    pub async fn quote(&self, symbol: &str) -> Result<Quote, EffectError> {
        let quotes = self.quotes.clone();
        let owned = symbol.to_string();
        self.prices
            .fetch_or_insert(symbol.to_uppercase(), async move { quotes.quote(&owned).await })
            .await
    }
}

impl std::fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEnv")
            .field("searches", &self.searches)
            .field("prices", &self.prices)
            .finish_non_exhaustive()
    }
}
