//! Validation rules.
//!
//! A rule is a named predicate over a [`SafetyMetrics`] snapshot. `Ok(true)`
//! means healthy; `Ok(false)` or an error means the rule is violated and its
//! action should be signalled.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use safeguard_types::{SafetyAction, SafetyMetrics, Severity};
use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Outcome of a rule predicate.
pub type RuleOutcome = Result<bool, RuleError>;

/// Shared rule predicate.
pub type RuleCondition = Arc<dyn Fn(&SafetyMetrics) -> RuleOutcome + Send + Sync>;

/// A named health predicate.
///
/// Immutable once registered apart from its enabled flag.
#[derive(Clone)]
pub struct ValidationRule {
    name: String,
    description: String,
    severity: Severity,
    action: SafetyAction,
    enabled: bool,
    condition: RuleCondition,
}

impl ValidationRule {
    /// Create an enabled rule from a fallible predicate.
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        action: SafetyAction,
        condition: F,
    ) -> Self
    where
        F: Fn(&SafetyMetrics) -> RuleOutcome + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            severity,
            action,
            enabled: true,
            condition: Arc::new(condition),
        }
    }

    /// Create an enabled rule from an infallible predicate.
    pub fn from_predicate<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        action: SafetyAction,
        predicate: F,
    ) -> Self
    where
        F: Fn(&SafetyMetrics) -> bool + Send + Sync + 'static,
    {
        Self::new(name, description, severity, action, move |m: &SafetyMetrics| {
            Ok(predicate(m))
        })
    }

    /// Register the rule disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn action(&self) -> SafetyAction {
        self.action
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn condition(&self) -> RuleCondition {
        self.condition.clone()
    }

    /// Evaluate on the current thread, converting a panic into [`RuleError::Panicked`].
    pub fn evaluate(&self, metrics: &SafetyMetrics) -> RuleOutcome {
        evaluate_condition(&self.condition, metrics)
    }

    pub fn info(&self) -> RuleInfo {
        RuleInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            severity: self.severity,
            action: self.action,
            enabled: self.enabled,
        }
    }
}

impl std::fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("action", &self.action)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

pub(crate) fn evaluate_condition(
    condition: &RuleCondition,
    metrics: &SafetyMetrics,
) -> RuleOutcome {
    catch_unwind(AssertUnwindSafe(|| condition(metrics))).unwrap_or(Err(RuleError::Panicked))
}

/// Serializable description of a registered rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleInfo {
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub action: SafetyAction,
    pub enabled: bool,
}
