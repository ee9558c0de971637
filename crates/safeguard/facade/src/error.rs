//! Error types for the safeguard facade.

use safeguard_controller::ControllerError;
use safeguard_validation::ValidationError;
use thiserror::Error;

/// Errors raised while configuring or wiring safeguard.
#[derive(Debug, Error)]
pub enum SafeguardError {
    /// Configuration could not be loaded or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A global tracing subscriber could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

/// Result type for facade operations.
pub type SafeguardResult<T> = Result<T, SafeguardError>;
