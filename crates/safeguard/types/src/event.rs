//! Safety events and their classification.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::SafetyAction;
use crate::ids::EventId;

/// Opaque key/value payload attached to an event by its producer.
pub type EventDetails = BTreeMap<String, serde_json::Value>;

/// Category of abnormal signal. Each kind owns one hysteresis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    PerformanceDegradation,
    MemoryLeak,
    ErrorSpike,
    ResourceExhaustion,
    BehaviorAnomaly,
}

impl TriggerKind {
    /// Every trigger kind, in declaration order.
    pub const ALL: [TriggerKind; 5] = [
        TriggerKind::PerformanceDegradation,
        TriggerKind::MemoryLeak,
        TriggerKind::ErrorSpike,
        TriggerKind::ResourceExhaustion,
        TriggerKind::BehaviorAnomaly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::PerformanceDegradation => "performance-degradation",
            TriggerKind::MemoryLeak => "memory-leak",
            TriggerKind::ErrorSpike => "error-spike",
            TriggerKind::ResourceExhaustion => "resource-exhaustion",
            TriggerKind::BehaviorAnomaly => "behavior-anomaly",
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity reported by the producer of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Safe,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Safe,
    ];

    /// Weight of this severity in the safety score.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Critical => 1.0,
            Severity::High => 0.7,
            Severity::Medium => 0.4,
            Severity::Low => 0.1,
            Severity::Safe => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Safe => "safe",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered abnormal-condition signal.
///
/// Created by the controller on registration and mutated only when the
/// event is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyEvent {
    /// Generated identifier.
    pub id: EventId,

    /// Category of the signal.
    pub trigger: TriggerKind,

    /// Producer-reported severity.
    pub severity: Severity,

    /// Wall-clock registration time.
    pub timestamp: DateTime<Utc>,

    /// Monotonic registration time, as an offset from the controller's clock origin.
    pub monotonic: Duration,

    /// Producer payload, merged with resolution details on resolve.
    pub details: EventDetails,

    /// Action tier chosen for this event.
    pub action: SafetyAction,

    /// Whether the hysteresis window escalated this event.
    pub escalated: bool,

    /// Whether the event has been resolved.
    pub resolved: bool,

    /// Wall-clock resolution time.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SafetyEvent {
    /// Create an unresolved event with a fresh id and no action yet.
    pub fn new(
        trigger: TriggerKind,
        severity: Severity,
        details: EventDetails,
        timestamp: DateTime<Utc>,
        monotonic: Duration,
    ) -> Self {
        Self {
            id: EventId::generate(),
            trigger,
            severity,
            timestamp,
            monotonic,
            details,
            action: SafetyAction::None,
            escalated: false,
            resolved: false,
            resolved_at: None,
        }
    }

    /// Mark the event resolved, merging `details` over the existing payload.
    ///
    /// Returns `false` if the event was already resolved.
    pub fn resolve(&mut self, details: EventDetails, at: DateTime<Utc>) -> bool {
        if self.resolved {
            return false;
        }
        self.details.extend(details);
        self.resolved = true;
        self.resolved_at = Some(at);
        true
    }
}
