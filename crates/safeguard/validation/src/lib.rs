#![deny(unsafe_code)]
//! # safeguard-validation
//!
//! Declarative health contract over safety metrics.
//!
//! A [`ValidationOrchestrator`] evaluates its [`ValidationRule`]s against a
//! snapshot pulled from a [`MetricsSource`] (normally the
//! [`SafetyEventController`](safeguard_controller::SafetyEventController)),
//! on demand and on a fixed interval, and keeps a bounded history of
//! [`ValidationResult`]s.
//!
//! A failed metrics fetch degrades to a default snapshot and a failing rule
//! degrades to a violated rule; neither fails the run.

pub mod config;
pub mod defaults;
pub mod error;
pub mod orchestrator;
pub mod result;
pub mod rule;
pub mod source;

pub use config::ValidationConfig;
pub use defaults::default_rules;
pub use error::{OrchestratorResult, RuleError, ValidationError};
pub use orchestrator::{ValidationOrchestrator, ValidationStatus};
pub use result::{RuleViolation, ValidationDetails, ValidationHistory, ValidationResult};
pub use rule::{RuleCondition, RuleInfo, RuleOutcome, ValidationRule};
pub use source::MetricsSource;
