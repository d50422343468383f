//! Configuration management for Unistore

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::logging::LogFormat;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Prefix action identities with a per-store namespace
    #[serde(default = "default_isolate_stores")]
    pub isolate_stores: bool,
    /// Default debounce delay (humantime, e.g. "300ms")
    #[serde(default = "default_debounce")]
    pub debounce: String,
    /// Default throttle window (humantime, e.g. "1s")
    #[serde(default = "default_throttle")]
    pub throttle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cache entry (humantime, e.g. "5m")
    #[serde(default = "default_lifetime")]
    pub lifetime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_isolate_stores() -> bool {
    true
}

fn default_debounce() -> String {
    "300ms".to_string()
}

fn default_throttle() -> String {
    "1s".to_string()
}

fn default_lifetime() -> String {
    "5m".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            isolate_stores: default_isolate_stores(),
            debounce: default_debounce(),
            throttle: default_throttle(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lifetime: default_lifetime(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

impl SchedulerConfig {
    pub fn debounce_delay(&self) -> Result<Duration> {
        parse_duration("scheduler.debounce", &self.debounce)
    }

    pub fn throttle_window(&self) -> Result<Duration> {
        parse_duration("scheduler.throttle", &self.throttle)
    }
}

impl CacheConfig {
    pub fn lifetime(&self) -> Result<Duration> {
        parse_duration("cache.lifetime", &self.lifetime)
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error: the defaults apply.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default_config());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingSection::default(),
        }
    }

    /// Check that every duration field parses
    pub fn validate(&self) -> Result<()> {
        self.scheduler.debounce_delay()?;
        self.scheduler.throttle_window()?;
        self.cache.lifetime()?;
        Ok(())
    }
}

/// Resolve the configuration file path: `UNISTORE_CONFIG`, else the XDG config dir
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("UNISTORE_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("unistore").join("config.toml"))
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|e| {
        ConfigError::InvalidDuration {
            field: field.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnistoreError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_durations() {
        let config = Config::default_config();
        assert!(config.scheduler.isolate_stores);
        assert_eq!(config.scheduler.debounce_delay().unwrap(), Duration::from_millis(300));
        assert_eq!(config.scheduler.throttle_window().unwrap(), Duration::from_secs(1));
        assert_eq!(config.cache.lifetime().unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[scheduler]
isolate_stores = false
debounce = "150ms"

[cache]
lifetime = "30s"

[logging]
format = "json"
level = "debug"
"#
        )
        .unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert!(!config.scheduler.isolate_stores);
        assert_eq!(config.scheduler.debounce_delay().unwrap(), Duration::from_millis(150));
        // Unset fields fall back to defaults
        assert_eq!(config.scheduler.throttle_window().unwrap(), Duration::from_secs(1));
        assert_eq!(config.cache.lifetime().unwrap(), Duration::from_secs(30));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = NamedTempFile::new().unwrap();
        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.cache.lifetime, "5m");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nlifetime = \"five minutes\"").unwrap();

        let err = Config::load_from_path(file.path()).unwrap_err();
        match err {
            UnistoreError::Config(ConfigError::InvalidDuration { field, .. }) => {
                assert_eq!(field, "cache.lifetime");
            }
            other => panic!("Expected InvalidDuration, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler\nisolate_stores = ").unwrap();

        let err = Config::load_from_path(file.path()).unwrap_err();
        assert!(matches!(err, UnistoreError::Config(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::load_from_path(Path::new("/nonexistent/unistore.toml")).unwrap_err();
        assert!(matches!(err, UnistoreError::Config(ConfigError::ReadError(_))));
    }
}
