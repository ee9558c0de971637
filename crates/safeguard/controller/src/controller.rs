//! Safety event controller.
//!
//! The controller owns every hysteresis window, the aggregate metrics and the
//! event log behind one lock. Registering an event updates all three under
//! that lock; callbacks for the chosen action run afterwards, on the caller's
//! thread, before `register_event` returns.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use safeguard_types::{
    EventDetails, EventId, SafetyAction, SafetyEvent, SafetyMetrics, Severity, TriggerKind,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::callbacks::{CallbackRegistry, CallbackResult};
use crate::clock::{Clock, SystemClock};
use crate::config::ControllerConfig;
use crate::error::{ControllerError, ControllerResult};
use crate::event_log::EventLog;
use crate::window::{HysteresisStatus, HysteresisWindow, WindowState};

/// State guarded by the controller lock.
struct ControllerState {
    running: bool,
    /// Monotonic time of the current (or last) activation.
    started_at: Option<Duration>,
    /// Uptime frozen by the last `stop()`.
    final_uptime: Option<Duration>,
    windows: BTreeMap<TriggerKind, HysteresisWindow>,
    metrics: SafetyMetrics,
    log: EventLog,
}

impl ControllerState {
    fn uptime(&self, now: Duration) -> Duration {
        match (self.running, self.started_at, self.final_uptime) {
            (true, Some(started), _) => now.saturating_sub(started),
            (false, _, Some(frozen)) => frozen,
            _ => Duration::ZERO,
        }
    }
}

/// Aggregate controller health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerHealth {
    pub running: bool,
    pub uptime: Duration,
    pub safety_score: f64,
    pub total_events: u64,
    pub logged_events: usize,
    pub pending_events: usize,
    pub resolved_events: usize,
    pub evicted_events: u64,
    pub registered_callbacks: usize,
    pub callback_failures: u64,
    /// Triggers whose warm-up cooldown is running.
    pub cooling_triggers: Vec<TriggerKind>,
    pub last_event_at: Option<DateTime<Utc>>,
}

/// Hysteresis-based escalation engine.
pub struct SafetyEventController {
    config: ControllerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<ControllerState>,
    callbacks: CallbackRegistry,
}

impl SafetyEventController {
    /// Create a controller on the system clock.
    pub fn new(config: ControllerConfig) -> ControllerResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a controller on an explicit clock.
    pub fn with_clock(config: ControllerConfig, clock: Arc<dyn Clock>) -> ControllerResult<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: ControllerConfig, clock: Arc<dyn Clock>) -> Self {
        let windows = TriggerKind::ALL
            .iter()
            .map(|trigger| {
                (
                    *trigger,
                    HysteresisWindow::new(*trigger, config.hysteresis_for(*trigger)),
                )
            })
            .collect();

        let state = ControllerState {
            running: false,
            started_at: None,
            final_uptime: None,
            windows,
            metrics: SafetyMetrics::default(),
            log: EventLog::new(config.max_event_log),
        };

        Self {
            config,
            clock,
            state: Mutex::new(state),
            callbacks: CallbackRegistry::new(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Start accepting events.
    ///
    /// Returns `true` if this call activated the controller, `false` if it was
    /// already running.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        if state.running {
            debug!("Safety event controller already running");
            return false;
        }

        let now = self.clock.monotonic();
        state.running = true;
        state.started_at = Some(now);
        state.final_uptime = None;
        state.metrics.started_at = Some(self.clock.wall());
        state.metrics.uptime = Duration::ZERO;

        info!("Safety event controller started");
        true
    }

    /// Stop accepting events and freeze uptime.
    ///
    /// Returns `true` if this call stopped a running controller.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if !state.running {
            debug!("Safety event controller already stopped");
            return false;
        }

        let uptime = state.uptime(self.clock.monotonic());
        state.running = false;
        state.final_uptime = Some(uptime);
        state.metrics.uptime = uptime;

        info!(
            uptime_secs = uptime.as_secs_f64(),
            total_events = state.metrics.total_events,
            "Safety event controller stopped"
        );
        true
    }

    /// Register an abnormal-condition signal.
    ///
    /// Rejected with [`ControllerError::NotRunning`] while stopped. Otherwise
    /// the event is pushed into its trigger's window, an action is chosen from
    /// the severity and escalation state, metrics are updated, the event is
    /// logged and the action's callbacks are invoked in registration order.
    ///
    /// Callbacks run on the calling thread after the controller lock is
    /// released. Handlers for one event run in order, but with concurrent
    /// producers the handlers for different events may interleave or run in
    /// a different order than the events were registered.
    #[instrument(skip_all, fields(trigger = %trigger, severity = %severity))]
    pub fn register_event(
        &self,
        trigger: TriggerKind,
        severity: Severity,
        details: EventDetails,
    ) -> ControllerResult<SafetyEvent> {
        let event = {
            let mut state = self.state.lock();
            if !state.running {
                warn!("Rejected safety event: controller not running");
                return Err(ControllerError::NotRunning);
            }

            let now = self.clock.monotonic();
            let wall = self.clock.wall();
            let mut event = SafetyEvent::new(trigger, severity, details, wall, now);

            let config = &self.config;
            let window = state
                .windows
                .entry(trigger)
                .or_insert_with(|| HysteresisWindow::new(trigger, config.hysteresis_for(trigger)));
            window.record(now);

            let should_escalate = window.should_escalate(now);
            let action = SafetyAction::resolve(severity, should_escalate);
            let escalated = should_escalate && action != SafetyAction::baseline(severity);
            if escalated {
                window.mark_action(now);
                info!(
                    event_id = %event.id,
                    action = %action,
                    warm_up_secs = window.config().warm_up_secs,
                    "Hysteresis window escalated"
                );
            }

            event.action = action;
            event.escalated = escalated;

            let uptime = state.uptime(now);
            state.metrics.record(trigger, severity, action, wall);
            state.metrics.uptime = uptime;

            if let Some(evicted) = state.log.push(event.clone()) {
                state.metrics.evicted_events += 1;
                debug!(
                    evicted_id = %evicted.id,
                    evicted_resolved = evicted.resolved,
                    capacity = state.log.capacity(),
                    "Event log full, evicted oldest entry"
                );
            }

            debug!(
                event_id = %event.id,
                action = %action,
                escalated,
                safety_score = state.metrics.safety_score,
                "Registered safety event"
            );
            event
        };

        let outcome = self.callbacks.dispatch(&event, self.config.slow_callback_threshold());
        if outcome.invoked > 0 {
            debug!(
                event_id = %event.id,
                invoked = outcome.invoked,
                failures = outcome.failures.len(),
                "Dispatched safety callbacks"
            );
        }
        Ok(event)
    }

    /// Resolve a pending event, merging `details` into its payload.
    ///
    /// Returns `false` if the event is unknown or already resolved.
    pub fn resolve_event(&self, id: &EventId, details: EventDetails) -> bool {
        match self.try_resolve_event(id, details) {
            Ok(()) => true,
            Err(e) => {
                debug!(event_id = %id, error = %e, "Event not resolved");
                false
            }
        }
    }

    /// Like [`resolve_event`](Self::resolve_event), reporting why resolution failed.
    pub fn try_resolve_event(&self, id: &EventId, details: EventDetails) -> ControllerResult<()> {
        let at = self.clock.wall();
        let mut state = self.state.lock();
        let event = state.log.resolve(id, details, at)?;
        info!(event_id = %id, trigger = %event.trigger, "Safety event resolved");
        Ok(())
    }

    /// Register a handler for an action tier. Duplicates are not removed.
    pub fn register_callback<F>(&self, action: SafetyAction, callback: F)
    where
        F: Fn(&SafetyEvent) -> CallbackResult + Send + Sync + 'static,
    {
        self.callbacks.register(action, Arc::new(callback));
        debug!(action = %action, "Registered safety callback");
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Copy of the current metrics.
    pub fn get_metrics(&self) -> SafetyMetrics {
        self.state.lock().metrics.clone()
    }

    /// Per-trigger window status as of now.
    pub fn get_hysteresis_status(&self) -> BTreeMap<TriggerKind, HysteresisStatus> {
        let now = self.clock.monotonic();
        let state = self.state.lock();
        state
            .windows
            .iter()
            .map(|(trigger, window)| (*trigger, window.status(now)))
            .collect()
    }

    /// Clear one trigger's window. Returns `false` for an unknown trigger.
    pub fn reset_window(&self, trigger: TriggerKind) -> bool {
        let mut state = self.state.lock();
        match state.windows.get_mut(&trigger) {
            Some(window) => {
                window.reset();
                info!(trigger = %trigger, "Hysteresis window reset");
                true
            }
            None => false,
        }
    }

    /// Clear every window.
    pub fn reset_windows(&self) {
        let mut state = self.state.lock();
        for window in state.windows.values_mut() {
            window.reset();
        }
        info!("All hysteresis windows reset");
    }

    pub fn get_event(&self, id: &EventId) -> Option<SafetyEvent> {
        self.state.lock().log.get(id).cloned()
    }

    /// Up to `limit` most recent events, newest first.
    pub fn recent_events(&self, limit: usize) -> Vec<SafetyEvent> {
        self.state.lock().log.recent(limit)
    }

    pub fn unresolved_events(&self) -> Vec<SafetyEvent> {
        self.state.lock().log.unresolved()
    }

    /// Aggregate status.
    pub fn health_check(&self) -> ControllerHealth {
        let now = self.clock.monotonic();
        let state = self.state.lock();
        let cooling_triggers = state
            .windows
            .iter()
            .filter(|(_, w)| w.state(now) == WindowState::Cooling)
            .map(|(t, _)| *t)
            .collect();

        ControllerHealth {
            running: state.running,
            uptime: state.uptime(now),
            safety_score: state.metrics.safety_score,
            total_events: state.metrics.total_events,
            logged_events: state.log.len(),
            pending_events: state.log.pending_count(),
            resolved_events: state.log.resolved_count(),
            evicted_events: state.metrics.evicted_events,
            registered_callbacks: self.callbacks.count(),
            callback_failures: self.callbacks.failure_count(),
            cooling_triggers,
            last_event_at: state.metrics.last_event_at,
        }
    }
}

impl Default for SafetyEventController {
    fn default() -> Self {
        Self::build(ControllerConfig::default(), Arc::new(SystemClock::new()))
    }
}

impl std::fmt::Debug for SafetyEventController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyEventController")
            .field("running", &self.is_running())
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}
