//! Per-trigger hysteresis window.
//!
//! Tracks recent violation times in a bounded FIFO and decides whether the
//! trigger should escalate:
//! - Quiescent: fewer than `window_size` recent violations
//! - Primed: a full window inside the time span, warm-up elapsed
//! - Cooling: an escalation fired less than `warm_up` ago

use std::collections::VecDeque;
use std::time::Duration;

use safeguard_types::{HysteresisConfig, TriggerKind};
use serde::{Deserialize, Serialize};

/// Conceptual state of a hysteresis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    /// Not enough recent violations to escalate.
    Quiescent,

    /// The next violation inside the span escalates.
    Primed,

    /// Escalation suppressed until warm-up elapses.
    Cooling,
}

impl std::fmt::Display for WindowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowState::Quiescent => write!(f, "quiescent"),
            WindowState::Primed => write!(f, "primed"),
            WindowState::Cooling => write!(f, "cooling"),
        }
    }
}

/// Sliding violation record for one trigger kind.
#[derive(Debug, Clone)]
pub struct HysteresisWindow {
    trigger: TriggerKind,
    config: HysteresisConfig,
    /// Violation times, oldest first. Never longer than `config.window_size`.
    violations: VecDeque<Duration>,
    /// When the last escalation fired.
    last_action_at: Option<Duration>,
}

impl HysteresisWindow {
    pub fn new(trigger: TriggerKind, config: HysteresisConfig) -> Self {
        Self {
            trigger,
            config,
            violations: VecDeque::with_capacity(config.window_size),
            last_action_at: None,
        }
    }

    pub fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    pub fn config(&self) -> &HysteresisConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn last_action_at(&self) -> Option<Duration> {
        self.last_action_at
    }

    /// Record a violation, evicting the oldest one when the window is full.
    pub fn record(&mut self, at: Duration) {
        while self.violations.len() >= self.config.window_size.max(1) {
            self.violations.pop_front();
        }
        self.violations.push_back(at);
    }

    /// False while an escalation's warm-up is still running.
    pub fn is_warmed_up(&self, now: Duration) -> bool {
        self.warm_up_remaining(now).is_zero()
    }

    /// Time left before escalation is allowed again.
    pub fn warm_up_remaining(&self, now: Duration) -> Duration {
        match self.last_action_at {
            None => Duration::ZERO,
            Some(last) => self
                .config
                .warm_up()
                .saturating_sub(now.saturating_sub(last)),
        }
    }

    /// Number of windowed violations no older than the time span.
    pub fn violations_within_span(&self, now: Duration) -> usize {
        let span = self.config.time_span();
        self.violations
            .iter()
            .filter(|at| now.saturating_sub(**at) <= span)
            .count()
    }

    fn is_full_within_span(&self, now: Duration) -> bool {
        self.violations.len() >= self.config.window_size
            && self.violations_within_span(now) == self.violations.len()
    }

    /// Whether a violation recorded at `now` escalates.
    pub fn should_escalate(&self, now: Duration) -> bool {
        self.is_warmed_up(now) && self.is_full_within_span(now)
    }

    /// Start the warm-up cooldown.
    pub fn mark_action(&mut self, now: Duration) {
        self.last_action_at = Some(now);
    }

    pub fn state(&self, now: Duration) -> WindowState {
        if !self.is_warmed_up(now) {
            WindowState::Cooling
        } else if self.is_full_within_span(now) {
            WindowState::Primed
        } else {
            WindowState::Quiescent
        }
    }

    /// Clear violations and any running cooldown.
    pub fn reset(&mut self) {
        self.violations.clear();
        self.last_action_at = None;
    }

    pub fn status(&self, now: Duration) -> HysteresisStatus {
        HysteresisStatus {
            trigger: self.trigger,
            window_size: self.config.window_size,
            time_span: self.config.time_span(),
            warm_up: self.config.warm_up(),
            violations_in_window: self.violations.len(),
            violations_within_span: self.violations_within_span(now),
            would_escalate: self.should_escalate(now),
            warm_up_remaining: self.warm_up_remaining(now),
            state: self.state(now),
        }
    }
}

/// Read-only view of a window at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HysteresisStatus {
    pub trigger: TriggerKind,
    pub window_size: usize,
    pub time_span: Duration,
    pub warm_up: Duration,
    pub violations_in_window: usize,
    pub violations_within_span: usize,
    /// Whether the window currently satisfies the escalation condition.
    pub would_escalate: bool,
    pub warm_up_remaining: Duration,
    pub state: WindowState,
}
