#![deny(unsafe_code)]
//! # safeguard-types
//!
//! Shared vocabulary for the safeguard runtime:
//!
//! - **Events**: [`SafetyEvent`] with its [`TriggerKind`] and [`Severity`]
//! - **Actions**: the graded [`SafetyAction`] tiers and the precedence table
//!   that maps a severity and escalation state onto a tier
//! - **Metrics**: the versioned [`SafetyMetrics`] snapshot and the
//!   severity-weighted safety score
//! - **Hysteresis**: per-trigger [`HysteresisConfig`] thresholds

pub mod action;
pub mod event;
pub mod hysteresis;
pub mod ids;
pub mod metrics;

pub use action::SafetyAction;
pub use event::{EventDetails, SafetyEvent, Severity, TriggerKind};
pub use hysteresis::HysteresisConfig;
pub use ids::EventId;
pub use metrics::{safety_score, SafetyMetrics, METRICS_SCHEMA_VERSION};
