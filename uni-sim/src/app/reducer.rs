//! Reducers for the watchlist and the counter
//!
//! Reducers stay pure: they compute the next state and describe the I/O
//! to run as an [`Effect`]. Effect failures come back as ordinary
//! `*Failed` actions through [`Effect::catch`] and land in `state.error`.

use libunistore::Effect;
use tracing::debug;

use super::actions::{AppAction, CounterAction};
use super::state::{AppState, CounterState, Trade};
use crate::services::SimEnv;

/// Watchlist reducer
pub fn reduce(state: AppState, action: AppAction, env: &SimEnv) -> (AppState, Effect<AppAction>) {
    match action {
        // === Search ===
        AppAction::QueryChanged { query, .. } => {
            if query.trim().is_empty() {
                return (
                    AppState {
                        query,
                        results: Vec::new(),
                        searching: false,
                        ..state
                    },
                    Effect::none(),
                );
            }

            let env = env.clone();
            let lookup = query.clone();
            (
                AppState {
                    query,
                    searching: true,
                    ..state
                },
                Effect::task(async move { env.search(&lookup).await.map(AppAction::SearchCompleted) })
                    .catch(|e| AppAction::SearchFailed(e.to_string())),
            )
        }

        AppAction::SearchCompleted(results) => (
            AppState {
                prices: state
                    .prices
                    .into_iter()
                    .chain(results.iter().map(|q| (q.symbol.clone(), q.price_cents)))
                    .collect(),
                results,
                searching: false,
                ..state
            },
            Effect::none(),
        ),

        AppAction::SearchFailed(error) => (
            AppState {
                searching: false,
                error: Some(error),
                ..state
            },
            Effect::none(),
        ),

        // === Trading ===
        AppAction::TradeRequested { symbol, quantity, .. } => {
            if quantity == 0 {
                return (state, Effect::none());
            }
            let held = state.holdings.get(&symbol.to_uppercase()).copied().unwrap_or(0);
            match held.checked_add(quantity) {
                Some(after) if after >= 0 => {}
                Some(_) => {
                    return (
                        AppState {
                            error: Some(format!("cannot sell {} {}: holding {}", quantity.unsigned_abs(), symbol, held)),
                            ..state
                        },
                        Effect::none(),
                    );
                }
                None => {
                    return (
                        AppState {
                            error: Some(format!("quantity {} {} is out of range", quantity, symbol)),
                            ..state
                        },
                        Effect::none(),
                    );
                }
            }

            let env = env.clone();
            (
                state,
                Effect::task(async move {
                    let quote = env.quote(&symbol).await?;
                    Ok::<_, libunistore::EffectError>(AppAction::TradeFilled(Trade {
                        symbol: quote.symbol,
                        quantity,
                        price_cents: quote.price_cents,
                    }))
                })
                .catch(|e| AppAction::TradeFailed(e.to_string())),
            )
        }

        AppAction::TradeFilled(trade) => {
            let held = state.holdings.get(&trade.symbol).copied().unwrap_or(0);
            let settled = trade.quantity.checked_mul(trade.price_cents).and_then(|cost| {
                let cash = state.cash_cents.checked_sub(cost)?;
                let shares = held.checked_add(trade.quantity)?;
                Some((cost, cash, shares))
            });
            let (cash_cents, shares) = match settled {
                Some((cost, cash, shares)) if cost <= state.cash_cents => (cash, shares),
                Some(_) => {
                    return (
                        AppState {
                            error: Some(format!("insufficient cash for {} {}", trade.quantity, trade.symbol)),
                            ..state
                        },
                        Effect::none(),
                    );
                }
                None => {
                    return (
                        AppState {
                            error: Some(format!("trade of {} {} is out of range", trade.quantity, trade.symbol)),
                            ..state
                        },
                        Effect::none(),
                    );
                }
            };

            debug!(symbol = %trade.symbol, quantity = trade.quantity, "Trade filled");
            let mut holdings = state.holdings;
            holdings.insert(trade.symbol.clone(), shares);
            let mut prices = state.prices;
            prices.insert(trade.symbol.clone(), trade.price_cents);
            let mut trades = state.trades;
            trades.push(trade);

            (
                AppState {
                    holdings,
                    prices,
                    trades,
                    cash_cents,
                    ..state
                },
                Effect::none(),
            )
        }

        AppAction::TradeFailed(error) => (
            AppState {
                error: Some(error),
                ..state
            },
            Effect::none(),
        ),

        // === Errors ===
        AppAction::DismissError => (AppState { error: None, ..state }, Effect::none()),
    }
}

/// Counter reducer
pub fn count(state: CounterState, action: CounterAction, _env: &()) -> (CounterState, Effect<CounterAction>) {
    match action {
        CounterAction::Inc => (
            CounterState {
                count: state.count + 1,
            },
            Effect::none(),
        ),
    }
}
