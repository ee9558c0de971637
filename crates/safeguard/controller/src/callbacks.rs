//! Action callbacks.
//!
//! Handlers are registered per action tier and invoked in registration
//! order. A handler that errors or panics is logged and counted; the
//! remaining handlers still run.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use safeguard_types::{SafetyAction, SafetyEvent};
use tracing::{debug, warn};

use crate::error::ControllerError;

/// Result returned by a callback.
pub type CallbackResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A handler invoked with the event that selected its action.
pub type SafetyCallback = Arc<dyn Fn(&SafetyEvent) -> CallbackResult + Send + Sync>;

/// Outcome of dispatching one event to its action's handlers.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Handlers invoked.
    pub invoked: usize,

    /// Failures, in invocation order.
    pub failures: Vec<ControllerError>,
}

impl DispatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Per-action callback lists.
#[derive(Default)]
pub struct CallbackRegistry {
    handlers: RwLock<BTreeMap<SafetyAction, Vec<SafetyCallback>>>,
    failures: AtomicU64,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `action`. Duplicates are kept.
    pub fn register(&self, action: SafetyAction, callback: SafetyCallback) {
        self.handlers.write().entry(action).or_default().push(callback);
    }

    /// Number of handlers for one action.
    pub fn count_for(&self, action: SafetyAction) -> usize {
        self.handlers.read().get(&action).map_or(0, Vec::len)
    }

    /// Number of handlers across all actions.
    pub fn count(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    /// Total handler failures since creation.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Invoke every handler registered for `event.action`.
    ///
    /// The handler list is copied before invocation so handlers may register
    /// further callbacks or query the controller.
    pub fn dispatch(&self, event: &SafetyEvent, slow_threshold: Duration) -> DispatchOutcome {
        let action = event.action;
        let handlers: Vec<SafetyCallback> = self
            .handlers
            .read()
            .get(&action)
            .cloned()
            .unwrap_or_default();

        let mut outcome = DispatchOutcome::default();
        for (index, handler) in handlers.iter().enumerate() {
            let started = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| handler(event)));
            let elapsed = started.elapsed();
            outcome.invoked += 1;

            if elapsed > slow_threshold {
                warn!(
                    action = %action,
                    callback = index,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Slow safety callback"
                );
            }

            let failure = match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(ControllerError::CallbackFailed {
                    action,
                    reason: e.to_string(),
                }),
                Err(_) => Some(ControllerError::CallbackPanicked { action }),
            };

            if let Some(error) = failure {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    event_id = %event.id,
                    action = %action,
                    callback = index,
                    error = %error,
                    "Safety callback failed"
                );
                outcome.failures.push(error);
            }
        }

        debug!(
            event_id = %event.id,
            action = %action,
            invoked = outcome.invoked,
            failed = outcome.failures.len(),
            "Dispatched safety callbacks"
        );
        outcome
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callbacks", &self.count())
            .field("failures", &self.failure_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;
    use safeguard_types::{EventDetails, Severity, TriggerKind};

    fn event(action: SafetyAction) -> SafetyEvent {
        let mut e = SafetyEvent::new(
            TriggerKind::ErrorSpike,
            Severity::High,
            EventDetails::new(),
            Utc::now(),
            Duration::ZERO,
        );
        e.action = action;
        e
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> SafetyCallback {
        let log = log.clone();
        Arc::new(move |_: &SafetyEvent| -> CallbackResult {
            log.lock().push(name);
            Ok(())
        })
    }

    #[test]
    fn test_runs_in_registration_order() {
        let registry = CallbackRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register(SafetyAction::Warn, recorder(&log, "a"));
        registry.register(SafetyAction::Warn, recorder(&log, "b"));
        registry.register(SafetyAction::Throttle, recorder(&log, "other"));

        let outcome = registry.dispatch(&event(SafetyAction::Warn), Duration::from_secs(1));
        assert_eq!(outcome.invoked, 2);
        assert!(outcome.all_succeeded());
        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[test]
    fn test_failures_are_isolated() {
        let registry = CallbackRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.register(
            SafetyAction::Warn,
            Arc::new(|_: &SafetyEvent| -> CallbackResult { Err("boom".into()) }),
        );
        registry.register(
            SafetyAction::Warn,
            Arc::new(|_: &SafetyEvent| -> CallbackResult { panic!("callback panic") }),
        );
        registry.register(SafetyAction::Warn, recorder(&log, "last"));

        let outcome = registry.dispatch(&event(SafetyAction::Warn), Duration::from_secs(1));
        assert_eq!(outcome.invoked, 3);
        assert_eq!(outcome.failures.len(), 2);
        assert!(matches!(
            outcome.failures[0],
            ControllerError::CallbackFailed { .. }
        ));
        assert!(matches!(
            outcome.failures[1],
            ControllerError::CallbackPanicked { .. }
        ));
        assert_eq!(*log.lock(), vec!["last"]);
        assert_eq!(registry.failure_count(), 2);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let registry = CallbackRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let cb = recorder(&log, "dup");
        registry.register(SafetyAction::None, cb.clone());
        registry.register(SafetyAction::None, cb);
        assert_eq!(registry.count_for(SafetyAction::None), 2);

        registry.dispatch(&event(SafetyAction::None), Duration::from_secs(1));
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn test_no_handlers() {
        let registry = CallbackRegistry::new();
        let outcome = registry.dispatch(&event(SafetyAction::EmergencyStop), Duration::ZERO);
        assert_eq!(outcome.invoked, 0);
        assert_eq!(registry.count(), 0);
    }
}
