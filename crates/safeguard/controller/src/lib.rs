#![deny(unsafe_code)]
//! # safeguard-controller
//!
//! The safety event controller turns raw abnormal-condition signals into a
//! graded, debounced response.
//!
//! Every [`TriggerKind`](safeguard_types::TriggerKind) owns a
//! [`HysteresisWindow`]. A window only escalates once it has seen a full
//! window of violations inside its time span, and after an escalation it
//! cools down for its warm-up period before it may escalate again. The
//! resulting [`SafetyAction`](safeguard_types::SafetyAction) is dispatched to
//! the callbacks registered for it, and aggregate
//! [`SafetyMetrics`](safeguard_types::SafetyMetrics) are kept up to date.

pub mod callbacks;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod event_log;
pub mod window;

pub use callbacks::{CallbackRegistry, CallbackResult, DispatchOutcome, SafetyCallback};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ControllerConfig;
pub use controller::{ControllerHealth, SafetyEventController};
pub use error::{ControllerError, ControllerResult};
pub use event_log::EventLog;
pub use window::{HysteresisStatus, HysteresisWindow, WindowState};
