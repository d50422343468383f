//! Error types for uni-sim
//!
//! Wraps core errors and scenario setup failures for unified handling in
//! `main`.

use thiserror::Error;

/// Simulation errors
#[derive(Error, Debug)]
pub enum SimError {
    /// Error from the state core (configuration, effects)
    #[error(transparent)]
    Core(#[from] libunistore::UnistoreError),

    /// A scenario finished with an uncaught effect failure
    #[error("Scenario failed: {0}")]
    Scenario(#[from] libunistore::EffectError),

    /// Output could not be written
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    /// Bad command line arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SimError {
    /// Process exit code, matching the core's conventions
    pub fn exit_code(&self) -> i32 {
        match self {
            SimError::Core(e) => e.exit_code(),
            SimError::Scenario(_) | SimError::Output(_) => 1,
            SimError::InvalidInput(_) => 3,
        }
    }
}

/// Result type for simulation operations
pub type Result<T> = std::result::Result<T, SimError>;
