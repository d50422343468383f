//! Scenario tests on a paused clock
//!
//! Verifies the observable outcome of each input burst: how many
//! dispatches reached the reducer, how often the quote service was hit,
//! and how often views were notified.

use libunistore::Config;
use std::time::Duration;
use uni_sim::scenario::{self, SimSettings};

fn settings() -> SimSettings {
    SimSettings::from_config(&Config::default_config())
        .unwrap()
        .with_latency(Duration::from_millis(80))
}

#[tokio::test(start_paused = true)]
async fn test_three_rapid_presses_increment_once() {
    let report = scenario::counter(&settings(), 3, Duration::ZERO).await.unwrap();
    assert_eq!(report.presses, 3);
    assert_eq!(report.count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_presses_outside_the_window_all_count() {
    let report = scenario::counter(&settings(), 3, Duration::from_millis(1100)).await.unwrap();
    assert_eq!(report.count, 3);
}

#[tokio::test(start_paused = true)]
async fn test_fast_typing_searches_once_for_full_query() {
    let report = scenario::search(&settings(), "tesla", Duration::from_millis(50))
        .await
        .unwrap();

    assert_eq!(report.keystrokes, 5);
    assert_eq!(report.query, "tesla");
    assert_eq!(report.service_calls, 1);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].symbol, "TSLA");
    assert_eq!(report.renders, 2, "empty list, then the final results");
    assert!(report.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_slow_typing_searches_each_prefix() {
    let report = scenario::search(&settings(), "ms", Duration::from_millis(500))
        .await
        .unwrap();

    assert_eq!(report.service_calls, 2);
    assert_eq!(report.query, "ms");
    assert_eq!(report.results[0].symbol, "MSFT");
}

#[tokio::test(start_paused = true)]
async fn test_offline_search_surfaces_error_in_state() {
    let settings = settings().with_offline(true);
    let report = scenario::search(&settings, "apple", Duration::from_millis(10))
        .await
        .unwrap();

    assert!(report.results.is_empty());
    assert!(report.error.unwrap().contains("unreachable"));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_buy_taps_trade_once_then_sell_through_view() {
    let report = scenario::trade(&settings(), "aapl", 2, 3, 1, Duration::from_millis(100))
        .await
        .unwrap();

    assert_eq!(report.trades.len(), 2);
    assert_eq!(report.trades[0].quantity, 2);
    assert_eq!(report.trades[1].quantity, -1);
    assert_eq!(report.portfolio.positions.len(), 1);
    assert_eq!(report.portfolio.positions[0].shares, 1);
    assert_eq!(report.service_calls, 1, "sell is priced from the cache");
    assert_eq!(report.portfolio_updates, 3, "initial, after buy, after sell");
    assert!(report.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_symbol_is_reported_as_state_error() {
    let report = scenario::trade(&settings(), "ZZZZ", 1, 1, 0, Duration::ZERO)
        .await
        .unwrap();

    assert!(report.trades.is_empty());
    assert_eq!(report.error.as_deref(), Some("Effect failed: unknown symbol ZZZZ"));
    assert_eq!(report.portfolio_updates, 1);
}

#[tokio::test(start_paused = true)]
async fn test_oversized_quantity_is_rejected_without_stopping_the_store() {
    let report = scenario::trade(&settings(), "AAPL", i64::MAX / 2, 1, 0, Duration::ZERO)
        .await
        .unwrap();

    assert!(report.trades.is_empty());
    assert!(report.error.as_deref().unwrap().contains("out of range"));
    assert_eq!(report.portfolio.cash_cents, uni_sim::app::state::STARTING_CASH_CENTS);
}

#[tokio::test(start_paused = true)]
async fn test_non_positive_quantity_is_invalid_input() {
    let err = scenario::trade(&settings(), "AAPL", 0, 1, 0, Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 3);
}
