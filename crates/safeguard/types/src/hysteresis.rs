//! Hysteresis thresholds for a single trigger kind.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Thresholds for one hysteresis window.
///
/// A window escalates once it holds `window_size` violations that all fall
/// within `time_span_secs`, unless an escalation fired less than
/// `warm_up_secs` ago.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HysteresisConfig {
    /// Minimum number of violations before escalation.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Span within which all windowed violations must fall, in seconds.
    #[serde(default = "default_time_span_secs")]
    pub time_span_secs: u64,

    /// Cooldown after an escalation during which escalation is suppressed, in seconds.
    #[serde(default = "default_warm_up_secs")]
    pub warm_up_secs: u64,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            time_span_secs: default_time_span_secs(),
            warm_up_secs: default_warm_up_secs(),
        }
    }
}

impl HysteresisConfig {
    pub fn new(window_size: usize, time_span_secs: u64, warm_up_secs: u64) -> Self {
        Self {
            window_size,
            time_span_secs,
            warm_up_secs,
        }
    }

    pub fn time_span(&self) -> Duration {
        Duration::from_secs(self.time_span_secs)
    }

    pub fn warm_up(&self) -> Duration {
        Duration::from_secs(self.warm_up_secs)
    }

    /// Check the thresholds are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("hysteresis window_size must be at least 1".to_string());
        }
        Ok(())
    }
}

fn default_window_size() -> usize {
    3
}

fn default_time_span_secs() -> u64 {
    180
}

fn default_warm_up_secs() -> u64 {
    60
}
