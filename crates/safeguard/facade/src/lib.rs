#![deny(unsafe_code)]
//! # safeguard
//!
//! Hysteresis-based safety event control with rule-based validation.
//!
//! This crate wires the [`SafetyEventController`] into a
//! [`ValidationOrchestrator`] and provides the combined configuration
//! loader and tracing setup. The building blocks are re-exported so most
//! users depend on this crate alone.
//!
//! ```no_run
//! use safeguard::{EventDetails, Safeguard, SafeguardConfig, Severity, TriggerKind};
//!
//! # async fn run() -> safeguard::SafeguardResult<()> {
//! let config = SafeguardConfig::load(Some("safeguard.toml"))?;
//! safeguard::telemetry::init(&config.logging)?;
//!
//! let safeguard = Safeguard::new(config)?;
//! safeguard.start().await;
//!
//! let event = safeguard.controller().register_event(
//!     TriggerKind::ErrorSpike,
//!     Severity::High,
//!     EventDetails::new(),
//! )?;
//! println!("action: {}", event.action);
//!
//! let result = safeguard.orchestrator().run_validation().await;
//! println!("healthy: {}", result.success);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;

pub use crate::config::{LoggingConfig, SafeguardConfig};
pub use crate::error::{SafeguardError, SafeguardResult};
pub use crate::service::{Safeguard, SafeguardHealth};

pub use safeguard_controller::{
    CallbackResult, Clock, ControllerConfig, ControllerError, ControllerHealth, HysteresisStatus,
    ManualClock, SafetyEventController, SystemClock, WindowState,
};
pub use safeguard_types::{
    EventDetails, EventId, HysteresisConfig, SafetyAction, SafetyEvent, SafetyMetrics, Severity,
    TriggerKind,
};
pub use safeguard_validation::{
    MetricsSource, RuleError, RuleOutcome, ValidationConfig, ValidationError,
    ValidationOrchestrator, ValidationResult, ValidationRule, ValidationStatus,
};
