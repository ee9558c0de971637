//! Default rule set.
//!
//! Each rule asserts that no events of its category have been registered.

use safeguard_types::{SafetyAction, Severity, TriggerKind};

use crate::rule::ValidationRule;

pub const PERFORMANCE_RULE: &str = "performance_degradation";
pub const ERROR_SPIKE_RULE: &str = "error_spike";
pub const RESOURCE_EXHAUSTION_RULE: &str = "resource_exhaustion";

/// Rules installed on construction and restored by `reset()`.
pub fn default_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::from_predicate(
            PERFORMANCE_RULE,
            "No performance degradation events have been registered",
            Severity::Medium,
            SafetyAction::Monitor,
            |m| m.trigger_count(TriggerKind::PerformanceDegradation) == 0,
        ),
        ValidationRule::from_predicate(
            ERROR_SPIKE_RULE,
            "No error spike events have been registered",
            Severity::High,
            SafetyAction::Warn,
            |m| m.trigger_count(TriggerKind::ErrorSpike) == 0,
        ),
        ValidationRule::from_predicate(
            RESOURCE_EXHAUSTION_RULE,
            "No resource exhaustion events have been registered",
            Severity::Low,
            SafetyAction::None,
            |m| m.trigger_count(TriggerKind::ResourceExhaustion) == 0,
        ),
    ]
}
