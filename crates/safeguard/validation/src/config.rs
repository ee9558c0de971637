//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorResult, ValidationError};

/// Configuration for the validation orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Interval between background validation runs, in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Pause after a failed background run, in seconds.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Maximum validation runs in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_validations: usize,

    /// Number of results retained in history.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Window used for recent-run accounting, in seconds.
    #[serde(default = "default_recent_window_secs")]
    pub recent_window_secs: u64,

    /// Per-rule evaluation timeout, in milliseconds.
    #[serde(default = "default_rule_timeout_ms")]
    pub rule_timeout_ms: u64,

    /// Start the orchestrator on the first `run_validation` call.
    #[serde(default = "default_true")]
    pub auto_start: bool,

    /// Install the default rule set on construction and reset.
    #[serde(default = "default_true")]
    pub install_default_rules: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retry_backoff_secs: default_retry_backoff_secs(),
            max_concurrent_validations: default_max_concurrent(),
            history_capacity: default_history_capacity(),
            recent_window_secs: default_recent_window_secs(),
            rule_timeout_ms: default_rule_timeout_ms(),
            auto_start: true,
            install_default_rules: true,
        }
    }
}

impl ValidationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn recent_window(&self) -> Duration {
        Duration::from_secs(self.recent_window_secs)
    }

    pub fn rule_timeout(&self) -> Duration {
        Duration::from_millis(self.rule_timeout_ms)
    }

    /// Reject configurations the orchestrator cannot run with.
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.interval_secs == 0 {
            return Err(ValidationError::Configuration(
                "interval_secs must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_validations == 0 {
            return Err(ValidationError::Configuration(
                "max_concurrent_validations must be at least 1".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(ValidationError::Configuration(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.rule_timeout_ms == 0 {
            return Err(ValidationError::Configuration(
                "rule_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_interval_secs() -> u64 {
    30
}

fn default_retry_backoff_secs() -> u64 {
    10
}

fn default_max_concurrent() -> usize {
    5
}

fn default_history_capacity() -> usize {
    1000
}

fn default_recent_window_secs() -> u64 {
    3600
}

fn default_rule_timeout_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}
