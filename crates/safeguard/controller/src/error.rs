//! Error types for safeguard-controller.

use safeguard_types::{EventId, SafetyAction};
use thiserror::Error;

/// Errors reported by the safety event controller.
///
/// None of these are fatal to the caller; they describe why an operation
/// was rejected or degraded.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The controller has not been started, or has been stopped.
    #[error("safety event controller is not running")]
    NotRunning,

    /// No event with this id is in the event log.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// The event was resolved earlier.
    #[error("event already resolved: {0}")]
    AlreadyResolved(EventId),

    /// A registered callback returned an error.
    #[error("callback for {action} failed: {reason}")]
    CallbackFailed { action: SafetyAction, reason: String },

    /// A registered callback panicked.
    #[error("callback for {action} panicked")]
    CallbackPanicked { action: SafetyAction },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;
