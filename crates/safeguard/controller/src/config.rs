//! Controller configuration.
//!
//! Hysteresis thresholds are resolved per trigger kind: an explicit entry in
//! `hysteresis` wins, otherwise `default_hysteresis` applies.

use std::collections::BTreeMap;
use std::time::Duration;

use safeguard_types::{HysteresisConfig, TriggerKind};
use serde::{Deserialize, Serialize};

use crate::error::{ControllerError, ControllerResult};

/// Configuration for the safety event controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Thresholds for triggers without an explicit override.
    #[serde(default)]
    pub default_hysteresis: HysteresisConfig,

    /// Per-trigger threshold overrides.
    #[serde(default)]
    pub hysteresis: BTreeMap<TriggerKind, HysteresisConfig>,

    /// Maximum number of events retained in the event log.
    #[serde(default = "default_max_event_log")]
    pub max_event_log: usize,

    /// Callbacks running longer than this are logged, in milliseconds.
    #[serde(default = "default_slow_callback_warn_ms")]
    pub slow_callback_warn_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_hysteresis: HysteresisConfig::default(),
            hysteresis: BTreeMap::new(),
            max_event_log: default_max_event_log(),
            slow_callback_warn_ms: default_slow_callback_warn_ms(),
        }
    }
}

impl ControllerConfig {
    /// Override the thresholds for one trigger.
    pub fn with_hysteresis(mut self, trigger: TriggerKind, config: HysteresisConfig) -> Self {
        self.hysteresis.insert(trigger, config);
        self
    }

    /// Replace the fallback thresholds.
    pub fn with_default_hysteresis(mut self, config: HysteresisConfig) -> Self {
        self.default_hysteresis = config;
        self
    }

    pub fn with_max_event_log(mut self, max: usize) -> Self {
        self.max_event_log = max;
        self
    }

    /// Thresholds in effect for a trigger.
    pub fn hysteresis_for(&self, trigger: TriggerKind) -> HysteresisConfig {
        self.hysteresis
            .get(&trigger)
            .copied()
            .unwrap_or(self.default_hysteresis)
    }

    pub fn slow_callback_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_callback_warn_ms)
    }

    /// Reject configurations the controller cannot operate with.
    pub fn validate(&self) -> ControllerResult<()> {
        self.default_hysteresis
            .validate()
            .map_err(ControllerError::Configuration)?;
        for (trigger, config) in &self.hysteresis {
            config
                .validate()
                .map_err(|e| ControllerError::Configuration(format!("{trigger}: {e}")))?;
        }
        if self.max_event_log == 0 {
            return Err(ControllerError::Configuration(
                "max_event_log must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_event_log() -> usize {
    10_000
}

fn default_slow_callback_warn_ms() -> u64 {
    250
}
