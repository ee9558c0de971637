//! Action tiers and the severity/escalation precedence table.

use serde::{Deserialize, Serialize};

use crate::event::Severity;

/// Graded response chosen for an event, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyAction {
    None,
    Monitor,
    Warn,
    Throttle,
    EmergencyStop,
}

impl SafetyAction {
    pub const ALL: [SafetyAction; 5] = [
        SafetyAction::None,
        SafetyAction::Monitor,
        SafetyAction::Warn,
        SafetyAction::Throttle,
        SafetyAction::EmergencyStop,
    ];

    /// Resolve the action for a severity given the hysteresis escalation state.
    ///
    /// Critical always stops; the other tiers step up one level when the
    /// window escalates.
    pub fn resolve(severity: Severity, escalate: bool) -> Self {
        match (severity, escalate) {
            (Severity::Critical, _) => SafetyAction::EmergencyStop,
            (Severity::High, true) => SafetyAction::Throttle,
            (Severity::High, false) => SafetyAction::Warn,
            (Severity::Medium, true) => SafetyAction::Warn,
            (Severity::Medium, false) => SafetyAction::Monitor,
            (Severity::Low, true) => SafetyAction::Monitor,
            (Severity::Low, false) => SafetyAction::None,
            (Severity::Safe, _) => SafetyAction::None,
        }
    }

    /// The non-escalated action for a severity.
    pub fn baseline(severity: Severity) -> Self {
        Self::resolve(severity, false)
    }

    /// Ordinal strength, 0 for `None` up to 4 for `EmergencyStop`.
    pub fn strength(&self) -> u8 {
        match self {
            SafetyAction::None => 0,
            SafetyAction::Monitor => 1,
            SafetyAction::Warn => 2,
            SafetyAction::Throttle => 3,
            SafetyAction::EmergencyStop => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyAction::None => "none",
            SafetyAction::Monitor => "monitor",
            SafetyAction::Warn => "warn",
            SafetyAction::Throttle => "throttle",
            SafetyAction::EmergencyStop => "emergency-stop",
        }
    }
}

impl std::fmt::Display for SafetyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
