//! Error types for safeguard-validation.

use thiserror::Error;

/// Failure of a single rule predicate.
///
/// A failing predicate marks its rule as violated; it never aborts the
/// validation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The predicate reported an error.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// The predicate panicked.
    #[error("predicate panicked")]
    Panicked,

    /// The predicate did not finish in time.
    #[error("predicate timed out after {after_ms}ms")]
    TimedOut { after_ms: u64 },
}

/// Errors reported by the validation orchestrator.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The metrics snapshot could not be fetched.
    #[error("metrics unavailable: {0}")]
    MetricsUnavailable(String),

    /// A rule with this name is already registered.
    #[error("duplicate rule: {0}")]
    DuplicateRule(String),

    /// No rule with this name is registered.
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    /// The orchestrator is stopped and auto-start is disabled.
    #[error("validation orchestrator is not running")]
    NotRunning,

    /// Concurrency slots were closed.
    #[error("validation orchestrator is shutting down")]
    Shutdown,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, ValidationError>;
