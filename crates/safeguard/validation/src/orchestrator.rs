//! Validation orchestrator.
//!
//! Evaluates the rule set against a metrics snapshot on demand and on a
//! fixed interval, and keeps a bounded history of results. At most
//! `max_concurrent_validations` runs are admitted at once; each run then
//! evaluates and records under the orchestrator's lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex as SyncMutex;
use safeguard_controller::SafetyEventController;
use safeguard_types::{SafetyMetrics, Severity};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ValidationConfig;
use crate::defaults::default_rules;
use crate::error::{OrchestratorResult, RuleError, ValidationError};
use crate::result::{RuleViolation, ValidationDetails, ValidationHistory, ValidationResult};
use crate::rule::{evaluate_condition, RuleInfo, ValidationRule};
use crate::source::MetricsSource;

/// Summary of recent validation activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationStatus {
    pub running: bool,
    pub total_rules: usize,
    pub enabled_rules: usize,
    /// Runs recorded inside the recent window.
    pub recent_validations: usize,
    /// Share of recent runs that succeeded; `None` without recent runs.
    pub recent_success_rate: Option<f64>,
    pub last_validation_at: Option<DateTime<Utc>>,
    pub history_len: usize,
}

/// Rules and history, guarded by the orchestrator lock.
struct OrchestratorState {
    rules: Vec<ValidationRule>,
    history: ValidationHistory,
}

struct Inner {
    config: ValidationConfig,
    source: Arc<dyn MetricsSource>,
    slots: Semaphore,
    state: Mutex<OrchestratorState>,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
}

/// Rule-based periodic health check over a [`MetricsSource`].
pub struct ValidationOrchestrator {
    inner: Arc<Inner>,
    task: SyncMutex<Option<JoinHandle<()>>>,
}

impl ValidationOrchestrator {
    /// Create a stopped orchestrator.
    pub fn new(
        config: ValidationConfig,
        source: Arc<dyn MetricsSource>,
    ) -> OrchestratorResult<Self> {
        config.validate()?;

        let rules = if config.install_default_rules {
            default_rules()
        } else {
            Vec::new()
        };
        let (shutdown, _) = watch::channel(false);

        let inner = Inner {
            slots: Semaphore::new(config.max_concurrent_validations),
            state: Mutex::new(OrchestratorState {
                rules,
                history: ValidationHistory::new(config.history_capacity),
            }),
            config,
            source,
            running: AtomicBool::new(false),
            shutdown,
        };

        Ok(Self {
            inner: Arc::new(inner),
            task: SyncMutex::new(None),
        })
    }

    /// Create an orchestrator validating a safety event controller.
    pub fn for_controller(
        config: ValidationConfig,
        controller: Arc<SafetyEventController>,
    ) -> OrchestratorResult<Self> {
        Self::new(config, controller)
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.inner.config
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Start the metrics source and the background validation loop.
    ///
    /// Returns `false` if the orchestrator was already running.
    pub async fn start(&self) -> bool {
        self.inner.source.ensure_running().await;

        let mut task = self.task.lock();
        if self.inner.running.swap(true, Ordering::SeqCst) {
            debug!("Validation orchestrator already running");
            return false;
        }

        self.inner.shutdown.send_replace(false);
        let shutdown = self.inner.shutdown.subscribe();
        let inner = self.inner.clone();
        *task = Some(tokio::spawn(validation_loop(inner, shutdown)));

        info!(
            interval_secs = self.inner.config.interval_secs,
            "Validation orchestrator started"
        );
        true
    }

    /// Stop the background loop, letting an in-flight run finish.
    ///
    /// Returns `false` if the orchestrator was not running.
    pub async fn stop(&self) -> bool {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.inner.shutdown.send_replace(true);

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Validation loop ended abnormally");
            }
        }

        info!("Validation orchestrator stopped");
        true
    }

    /// Evaluate every enabled rule against a fresh metrics snapshot.
    ///
    /// Always returns a result; failures surface as `success == false` with
    /// entries in `errors`.
    pub async fn run_validation(&self) -> ValidationResult {
        if !self.is_running() {
            if self.inner.config.auto_start {
                self.start().await;
            } else {
                warn!("Validation requested while orchestrator stopped");
                return ValidationResult::rejected(ValidationError::NotRunning.to_string());
            }
        }

        match self.inner.execute().await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Validation run rejected");
                ValidationResult::rejected(e.to_string())
            }
        }
    }

    /// Add a rule. Names are unique.
    pub async fn add_rule(&self, rule: ValidationRule) -> OrchestratorResult<()> {
        let mut state = self.inner.state.lock().await;
        if state.rules.iter().any(|r| r.name() == rule.name()) {
            return Err(ValidationError::DuplicateRule(rule.name().to_string()));
        }
        info!(rule = rule.name(), severity = %rule.severity(), "Validation rule added");
        state.rules.push(rule);
        Ok(())
    }

    /// Remove a rule by name. Returns `false` if no such rule exists.
    pub async fn remove_rule(&self, name: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        let before = state.rules.len();
        state.rules.retain(|r| r.name() != name);
        let removed = state.rules.len() != before;
        if removed {
            info!(rule = name, "Validation rule removed");
        }
        removed
    }

    /// Enable or disable a rule. Returns `false` if no such rule exists.
    pub async fn set_rule_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut state = self.inner.state.lock().await;
        match state.rules.iter_mut().find(|r| r.name() == name) {
            Some(rule) => {
                rule.set_enabled(enabled);
                debug!(rule = name, enabled, "Validation rule toggled");
                true
            }
            None => false,
        }
    }

    /// Look up a registered rule by name.
    pub async fn rule(&self, name: &str) -> OrchestratorResult<RuleInfo> {
        let state = self.inner.state.lock().await;
        state
            .rules
            .iter()
            .find(|r| r.name() == name)
            .map(ValidationRule::info)
            .ok_or_else(|| ValidationError::RuleNotFound(name.to_string()))
    }

    /// Registered rules in evaluation order.
    pub async fn rules(&self) -> Vec<RuleInfo> {
        let state = self.inner.state.lock().await;
        state.rules.iter().map(ValidationRule::info).collect()
    }

    /// Retained results, oldest first.
    pub async fn history(&self) -> Vec<ValidationResult> {
        let state = self.inner.state.lock().await;
        state.history.iter().cloned().collect()
    }

    pub async fn last_result(&self) -> Option<ValidationResult> {
        let state = self.inner.state.lock().await;
        state.history.last().cloned()
    }

    pub async fn clear_history(&self) {
        self.inner.state.lock().await.history.clear();
    }

    pub async fn get_validation_status(&self) -> ValidationStatus {
        let state = self.inner.state.lock().await;
        // A window reaching past the representable range covers all history.
        let cutoff = chrono::Duration::from_std(self.inner.config.recent_window())
            .ok()
            .and_then(|window| Utc::now().checked_sub_signed(window));

        let tally =
            |(n, ok): (usize, usize), r: &ValidationResult| (n + 1, ok + usize::from(r.success));
        let (recent, succeeded) = match cutoff {
            Some(cutoff) => state.history.since(cutoff).fold((0, 0), tally),
            None => state.history.iter().fold((0, 0), tally),
        };

        ValidationStatus {
            running: self.is_running(),
            total_rules: state.rules.len(),
            enabled_rules: state.rules.iter().filter(|r| r.is_enabled()).count(),
            recent_validations: recent,
            recent_success_rate: (recent > 0).then(|| succeeded as f64 / recent as f64),
            last_validation_at: state.history.last().map(|r| r.timestamp),
            history_len: state.history.len(),
        }
    }

    /// Stop, clear history and rules, then restore the default rule set.
    pub async fn reset(&self) {
        self.stop().await;
        let mut state = self.inner.state.lock().await;
        state.history.clear();
        state.rules = if self.inner.config.install_default_rules {
            default_rules()
        } else {
            Vec::new()
        };
        info!("Validation orchestrator reset");
    }
}

impl Drop for ValidationOrchestrator {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.shutdown.send_replace(true);
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ValidationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationOrchestrator")
            .field("running", &self.is_running())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// One admitted validation run.
    async fn execute(&self) -> OrchestratorResult<ValidationResult> {
        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| ValidationError::Shutdown)?;
        let mut state = self.state.lock().await;
        let started = Instant::now();

        let mut warnings = Vec::new();
        let (metrics, metrics_degraded) = match self.source.fetch_metrics().await {
            Ok(metrics) => (metrics, false),
            Err(e) => {
                warn!(error = %e, "Metrics fetch failed, validating against default snapshot");
                warnings.push(format!("metrics fetch failed, using default snapshot: {e}"));
                (SafetyMetrics::default(), true)
            }
        };

        let mut details = ValidationDetails {
            metrics_degraded,
            ..Default::default()
        };
        let mut errors = Vec::new();

        for rule in state.rules.iter().filter(|r| r.is_enabled()) {
            details.rules_evaluated += 1;
            let outcome = self.evaluate(rule, &metrics).await;

            let error = match outcome {
                Ok(true) => {
                    details.passed_rules.push(rule.name().to_string());
                    continue;
                }
                Ok(false) => None,
                Err(e) => Some(e.to_string()),
            };

            let message = match &error {
                Some(e) => format!("rule '{}' failed: {}", rule.name(), e),
                None => format!("rule '{}' violated: {}", rule.name(), rule.description()),
            };
            if error.is_some() || matches!(rule.severity(), Severity::Critical | Severity::High) {
                errors.push(message);
            } else {
                warnings.push(message);
            }

            warn!(
                rule = rule.name(),
                severity = %rule.severity(),
                action = %rule.action(),
                error = error.as_deref().unwrap_or(""),
                "Validation rule violated"
            );
            details.violated_rules.push(rule.name().to_string());
            details.violations.push(RuleViolation {
                rule: rule.name().to_string(),
                severity: rule.severity(),
                action: rule.action(),
                error,
            });
        }

        details.duration = started.elapsed();
        let result = ValidationResult {
            id: Uuid::new_v4(),
            success: details.violated_rules.is_empty(),
            timestamp: Utc::now(),
            details,
            errors,
            warnings,
            metrics,
        };

        debug!(
            success = result.success,
            evaluated = result.details.rules_evaluated,
            violated = result.details.violated_rules.len(),
            "Validation run complete"
        );
        state.history.push(result.clone());
        Ok(result)
    }

    /// Evaluate one predicate on the blocking pool, bounded by the rule timeout.
    async fn evaluate(
        &self,
        rule: &ValidationRule,
        metrics: &SafetyMetrics,
    ) -> Result<bool, RuleError> {
        let timeout = self.config.rule_timeout();
        let condition = rule.condition();
        let snapshot = metrics.clone();
        let task = tokio::task::spawn_blocking(move || evaluate_condition(&condition, &snapshot));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RuleError::Panicked),
            Err(_) => Err(RuleError::TimedOut {
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

/// Background loop.
///
/// Runs once per interval. A run that fails or had to fall back to default
/// metrics is retried after `retry_backoff`, and the interval restarts from
/// the retry.
async fn validation_loop(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let period = inner.config.interval();
    let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut retry = false;

    loop {
        if !retry {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
        }
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }

        retry = match inner.execute().await {
            Ok(result) if result.details.metrics_degraded => {
                warn!(
                    backoff_secs = inner.config.retry_backoff_secs,
                    "Scheduled validation ran on degraded metrics, retrying after backoff"
                );
                true
            }
            Ok(result) => {
                debug!(success = result.success, "Scheduled validation finished");
                false
            }
            Err(e) => {
                error!(
                    error = %e,
                    backoff_secs = inner.config.retry_backoff_secs,
                    "Scheduled validation failed, retrying after backoff"
                );
                true
            }
        };

        if retry {
            tokio::select! {
                _ = tokio::time::sleep(inner.config.retry_backoff()) => {}
                _ = shutdown.changed() => break,
            }
            ticker.reset();
        }
    }

    debug!("Validation loop exited");
}
