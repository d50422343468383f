//! uni-sim - scripted watchlist simulation on libunistore
//!
//! Replays bursts of UI input against the stores and prints the final
//! state as JSON on stdout. Logs go to stderr.

use clap::{Parser, Subcommand};
use libunistore::logging::{LogFormat, LoggingConfig};
use libunistore::Config;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use uni_sim::{scenario, Result, SimSettings};

#[derive(Parser, Debug)]
#[command(name = "uni-sim")]
#[command(version, about = "Replay UI input bursts against a unistore watchlist")]
#[command(long_about = r#"Replay UI input bursts against a unistore watchlist.

EXAMPLES:
    # Three rapid presses of a button throttled under "inc" for 1s
    uni-sim counter --presses 3

    # Type a query with 50ms between keystrokes; searches are debounced
    uni-sim search tesla --gap 50ms

    # Tap buy three times, then sell one share from the portfolio view
    uni-sim trade AAPL --taps 3 --sell 1

    # Simulate an unreachable quote service
    uni-sim search apple --offline

EXIT CODES:
    0 - Success
    1 - Scenario failed
    2 - Configuration error
    3 - Invalid input
"#)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/unistore/config.toml)
    #[arg(short, long, global = true, env = "UNISTORE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log format: text, json, or pretty (overrides the config file)
    #[arg(long, global = true, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Simulated quote service latency
    #[arg(long, global = true, default_value = "80ms", value_parser = humantime::parse_duration)]
    latency: Duration,

    /// Make every quote service call fail
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Press the throttled increment button repeatedly
    Counter {
        /// Number of presses
        #[arg(long, default_value_t = 3)]
        presses: u32,

        /// Time between presses
        #[arg(long, default_value = "0ms", value_parser = humantime::parse_duration)]
        gap: Duration,
    },

    /// Type a search query one character at a time
    Search {
        /// Query to type
        query: String,

        /// Time between keystrokes
        #[arg(long, default_value = "50ms", value_parser = humantime::parse_duration)]
        gap: Duration,
    },

    /// Tap buy repeatedly, then optionally sell from the portfolio view
    Trade {
        /// Symbol to trade
        symbol: String,

        /// Shares per buy
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,

        /// Number of buy taps
        #[arg(long, default_value_t = 3)]
        taps: u32,

        /// Shares to sell afterwards (0 to skip)
        #[arg(long, default_value_t = 0)]
        sell: i64,

        /// Time between taps
        #[arg(long, default_value = "100ms", value_parser = humantime::parse_duration)]
        gap: Duration,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    LoggingConfig::from_section(&config.logging)
        .format(cli.log_format.unwrap_or(config.logging.format))
        .verbose(cli.verbose)
        .init();

    let settings = SimSettings::from_config(&config)?
        .with_latency(cli.latency)
        .with_offline(cli.offline);
    tracing::debug!(?settings, "Simulation settings");

    match cli.command {
        Command::Counter { presses, gap } => print(&scenario::counter(&settings, presses, gap).await?),
        Command::Search { query, gap } => print(&scenario::search(&settings, &query, gap).await?),
        Command::Trade {
            symbol,
            quantity,
            taps,
            sell,
            gap,
        } => print(&scenario::trade(&settings, &symbol, quantity, taps, sell, gap).await?),
    }
}

fn print<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
