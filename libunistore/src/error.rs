//! Error types for Unistore

use thiserror::Error;

pub type Result<T> = std::result::Result<T, UnistoreError>;

#[derive(Error, Debug)]
pub enum UnistoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl UnistoreError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            UnistoreError::InvalidInput(_) => 3,
            UnistoreError::Config(_) => 2,
            UnistoreError::Effect(EffectError::Authentication(_)) => 2,
            UnistoreError::Effect(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid duration for {field}: {reason}")]
    InvalidDuration { field: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failure surfaced by an in-flight effect.
///
/// Effect failures are data: reducers map them into ordinary actions with
/// [`Effect::catch`](crate::effect::Effect::catch), and anything left
/// uncaught is reported to the completion callback of the root dispatch.
/// The type is `Clone` because one failure may be observed both by a
/// completion callback attached to an inner effect and by the root chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Effect failed: {0}")]
    Failed(String),

    /// The store's actor stopped before the action could be reduced
    #[error("Store stopped: {0}")]
    StoreStopped(String),
}

impl EffectError {
    /// Wrap any displayable failure as a generic effect failure
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        EffectError::Failed(reason.to_string())
    }
}

impl From<anyhow::Error> for EffectError {
    fn from(err: anyhow::Error) -> Self {
        EffectError::Failed(format!("{:#}", err))
    }
}
