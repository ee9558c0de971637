//! Validation results and bounded history.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use safeguard_types::{SafetyAction, SafetyMetrics, Severity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rule that did not hold during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule: String,
    pub severity: Severity,
    /// Action the rule asks to be signalled.
    pub action: SafetyAction,
    /// Predicate error, when the rule failed rather than returned false.
    pub error: Option<String>,
}

/// Structured details of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationDetails {
    /// Enabled rules evaluated.
    pub rules_evaluated: usize,

    /// Names of rules that held.
    pub passed_rules: Vec<String>,

    /// Names of rules that were violated, in evaluation order.
    pub violated_rules: Vec<String>,

    /// Violation records, in evaluation order.
    pub violations: Vec<RuleViolation>,

    /// Whether the run fell back to a default metrics snapshot.
    pub metrics_degraded: bool,

    /// Wall time spent evaluating.
    pub duration: Duration,
}

/// Immutable outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub id: Uuid,

    /// AND of every enabled rule's outcome.
    pub success: bool,

    pub timestamp: DateTime<Utc>,
    pub details: ValidationDetails,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,

    /// Snapshot the rules were evaluated against.
    pub metrics: SafetyMetrics,
}

impl ValidationResult {
    /// A failed result for a run that could not evaluate any rule.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            success: false,
            timestamp: Utc::now(),
            details: ValidationDetails::default(),
            errors: vec![reason.into()],
            warnings: Vec::new(),
            metrics: SafetyMetrics::default(),
        }
    }

    pub fn violated(&self, rule: &str) -> bool {
        self.details.violated_rules.iter().any(|r| r == rule)
    }
}

/// FIFO of past results, oldest evicted past capacity.
#[derive(Debug, Clone)]
pub struct ValidationHistory {
    entries: VecDeque<ValidationResult>,
    capacity: usize,
}

impl ValidationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, result: ValidationResult) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    pub fn last(&self) -> Option<&ValidationResult> {
        self.entries.back()
    }

    /// Results recorded at or after `since`, oldest first.
    pub fn since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &ValidationResult> {
        self.entries.iter().filter(move |r| r.timestamp >= since)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
