//! Subscriber setup for binaries built on Unistore
//!
//! The library only emits `tracing` events: dispatches and scheduling
//! decisions at `debug`, state replacements and cache traffic at `trace`,
//! uncaught effect failures at `warn`. A binary installs one subscriber
//! from its `[logging]` config section:
//!
//! ```no_run
//! use libunistore::logging::{LogFormat, LoggingConfig};
//! use libunistore::Config;
//!
//! let config = Config::default_config();
//! LoggingConfig::from_section(&config.logging)
//!     .format(LogFormat::Json)
//!     .init();
//! ```
//!
//! `RUST_LOG` always wins over the configured level.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSection;

/// Where and how log lines are rendered (always on stderr)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain lines without targets, for piping
    #[default]
    Text,
    /// One flattened JSON object per event
    Json,
    Pretty,
}

impl LogFormat {
    const NAMES: [(&'static str, LogFormat); 3] = [
        ("text", LogFormat::Text),
        ("json", LogFormat::Json),
        ("pretty", LogFormat::Pretty),
    ];

    pub fn name(self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, format)| *format)
            .ok_or_else(|| format!("unknown log format '{}' (expected text, json or pretty)", s))
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Subscriber settings resolved from config, CLI flags and environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    format: LogFormat,
    level: String,
    verbose: bool,
}

impl LoggingConfig {
    pub fn from_section(section: &LoggingSection) -> Self {
        Self {
            format: section.format,
            level: section.level.clone(),
            verbose: false,
        }
    }

    /// Settings from `UNISTORE_LOG_FORMAT` and `UNISTORE_LOG_LEVEL`,
    /// defaulting to text at `info`; unparseable formats fall back to text
    pub fn from_env() -> Self {
        Self {
            format: std::env::var("UNISTORE_LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            level: std::env::var("UNISTORE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            verbose: false,
        }
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Raise the level to `debug` (ignored when `RUST_LOG` is set)
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Directive used when `RUST_LOG` is absent
    pub fn directive(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.level
        }
    }

    /// Install the global subscriber
    ///
    /// Returns `false` if one was already installed; the existing one is
    /// kept.
    pub fn init(&self) -> bool {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        let installed = match self.format {
            LogFormat::Text => builder.with_target(false).try_init(),
            LogFormat::Json => builder
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true)
                .try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
        };

        match installed {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Subscriber already installed");
                false
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: "info".to_string(),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names_parse_case_insensitively() {
        assert_eq!("Json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(LogFormat::Pretty.to_string().parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("yaml".parse::<LogFormat>().unwrap_err().contains("'yaml'"));
    }

    #[test]
    fn test_verbose_overrides_configured_level() {
        let section = LoggingSection {
            format: LogFormat::Json,
            level: "warn".to_string(),
        };
        let config = LoggingConfig::from_section(&section);
        assert_eq!(config.directive(), "warn");
        assert_eq!(config.clone().verbose(true).directive(), "debug");
        assert_eq!(config.format(LogFormat::Text).format, LogFormat::Text);
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_reads_unistore_variables() {
        std::env::set_var("UNISTORE_LOG_FORMAT", "PRETTY");
        std::env::set_var("UNISTORE_LOG_LEVEL", "libunistore=trace");
        let config = LoggingConfig::from_env();
        std::env::remove_var("UNISTORE_LOG_FORMAT");
        std::env::remove_var("UNISTORE_LOG_LEVEL");

        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.directive(), "libunistore=trace");
        assert_eq!(LoggingConfig::from_env(), LoggingConfig::default());
    }

    #[test]
    fn test_second_init_keeps_first_subscriber() {
        LoggingConfig::default().init();
        assert!(!LoggingConfig::default().format(LogFormat::Json).init());
    }
}
