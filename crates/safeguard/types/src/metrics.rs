//! Aggregate safety telemetry.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::SafetyAction;
use crate::event::{Severity, TriggerKind};

/// Version of the [`SafetyMetrics`] layout.
pub const METRICS_SCHEMA_VERSION: u32 = 1;

/// Cumulative counters maintained by the controller.
///
/// Callers always receive a copy; nothing outside the controller mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyMetrics {
    /// Layout version of this snapshot.
    pub schema_version: u32,

    /// Total accepted events.
    pub total_events: u64,

    /// Accepted events per severity.
    pub events_by_severity: BTreeMap<Severity, u64>,

    /// Accepted events per trigger kind.
    pub events_by_trigger: BTreeMap<TriggerKind, u64>,

    /// Actions chosen per tier.
    pub actions_fired: BTreeMap<SafetyAction, u64>,

    /// Wall-clock time of the most recent event.
    pub last_event_at: Option<DateTime<Utc>>,

    /// Wall-clock time the controller was first started.
    pub started_at: Option<DateTime<Utc>>,

    /// Controller uptime as of the last state change.
    pub uptime: Duration,

    /// Severity-weighted health indicator in `[0, 1]`.
    pub safety_score: f64,

    /// Events dropped from the bounded event log.
    pub evicted_events: u64,
}

impl Default for SafetyMetrics {
    fn default() -> Self {
        Self {
            schema_version: METRICS_SCHEMA_VERSION,
            total_events: 0,
            events_by_severity: BTreeMap::new(),
            events_by_trigger: BTreeMap::new(),
            actions_fired: BTreeMap::new(),
            last_event_at: None,
            started_at: None,
            uptime: Duration::ZERO,
            safety_score: 1.0,
            evicted_events: 0,
        }
    }
}

impl SafetyMetrics {
    /// Count one accepted event and refresh the safety score.
    pub fn record(
        &mut self,
        trigger: TriggerKind,
        severity: Severity,
        action: SafetyAction,
        at: DateTime<Utc>,
    ) {
        self.total_events += 1;
        *self.events_by_severity.entry(severity).or_insert(0) += 1;
        *self.events_by_trigger.entry(trigger).or_insert(0) += 1;
        *self.actions_fired.entry(action).or_insert(0) += 1;
        self.last_event_at = Some(at);
        self.safety_score = safety_score(&self.events_by_severity, self.total_events);
    }

    pub fn severity_count(&self, severity: Severity) -> u64 {
        self.events_by_severity.get(&severity).copied().unwrap_or(0)
    }

    pub fn trigger_count(&self, trigger: TriggerKind) -> u64 {
        self.events_by_trigger.get(&trigger).copied().unwrap_or(0)
    }

    pub fn action_count(&self, action: SafetyAction) -> u64 {
        self.actions_fired.get(&action).copied().unwrap_or(0)
    }
}

/// Compute the safety score from per-severity counts.
///
/// `1 - Σ(weight · count) / (total · weight(critical))`, floored at 0.
/// With no events the score is 1.
pub fn safety_score(by_severity: &BTreeMap<Severity, u64>, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let weighted: f64 = by_severity
        .iter()
        .map(|(severity, count)| severity.weight() * *count as f64)
        .sum();
    let max = total as f64 * Severity::Critical.weight();
    (1.0 - weighted / max).clamp(0.0, 1.0)
}
