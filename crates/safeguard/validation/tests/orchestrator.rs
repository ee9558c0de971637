//! Validation orchestrator behaviour against a live controller and stub sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use safeguard_controller::{ControllerConfig, SafetyEventController};
use safeguard_types::{EventDetails, SafetyAction, SafetyMetrics, Severity, TriggerKind};
use safeguard_validation::defaults::{ERROR_SPIKE_RULE, PERFORMANCE_RULE};
use safeguard_validation::{
    MetricsSource, OrchestratorResult, RuleError, ValidationConfig, ValidationError,
    ValidationOrchestrator, ValidationRule,
};

fn controller() -> Arc<SafetyEventController> {
    Arc::new(SafetyEventController::new(ControllerConfig::default()).unwrap())
}

fn orchestrator(config: ValidationConfig) -> (ValidationOrchestrator, Arc<SafetyEventController>) {
    let controller = controller();
    let orchestrator = ValidationOrchestrator::for_controller(config, controller.clone()).unwrap();
    (orchestrator, controller)
}

struct FailingSource;

#[async_trait]
impl MetricsSource for FailingSource {
    async fn fetch_metrics(&self) -> OrchestratorResult<SafetyMetrics> {
        Err(ValidationError::MetricsUnavailable("collector offline".into()))
    }
}

#[tokio::test]
async fn test_clean_run_succeeds_and_starts_everything() {
    let (orchestrator, controller) = orchestrator(ValidationConfig::default());
    assert!(!orchestrator.is_running());
    assert!(!controller.is_running());

    let result = orchestrator.run_validation().await;
    assert!(result.success);
    assert_eq!(result.details.rules_evaluated, 3);
    assert!(result.errors.is_empty());
    assert!(orchestrator.is_running());
    assert!(controller.is_running());
}

#[tokio::test]
async fn test_error_event_violates_error_rule() {
    let (orchestrator, controller) = orchestrator(ValidationConfig::default());
    orchestrator
        .add_rule(ValidationRule::from_predicate(
            "no_error_events",
            "errorEvents == 0",
            Severity::Critical,
            SafetyAction::EmergencyStop,
            |m| m.trigger_count(TriggerKind::ErrorSpike) == 0,
        ))
        .await
        .unwrap();
    orchestrator.start().await;

    controller
        .register_event(TriggerKind::ErrorSpike, Severity::Critical, EventDetails::new())
        .unwrap();

    let result = orchestrator.run_validation().await;
    assert!(!result.success);
    assert!(result.violated("no_error_events"));
    assert!(result.violated(ERROR_SPIKE_RULE));
    assert!(!result.violated(PERFORMANCE_RULE));
    assert_eq!(result.metrics.total_events, 1);

    let violation = result
        .details
        .violations
        .iter()
        .find(|v| v.rule == "no_error_events")
        .unwrap();
    assert_eq!(violation.action, SafetyAction::EmergencyStop);
    assert!(violation.error.is_none());
    assert_eq!(result.errors.len(), 2);
}

#[tokio::test]
async fn test_low_severity_violation_is_a_warning() {
    let (orchestrator, controller) = orchestrator(ValidationConfig::default());
    controller.start();
    controller
        .register_event(TriggerKind::ResourceExhaustion, Severity::Medium, EventDetails::new())
        .unwrap();

    let result = orchestrator.run_validation().await;
    assert!(!result.success);
    assert!(result.errors.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("resource_exhaustion"));
}

#[tokio::test]
async fn test_failing_rule_is_violated_not_fatal() {
    let (orchestrator, _) = orchestrator(ValidationConfig::default());
    orchestrator
        .add_rule(ValidationRule::new(
            "broken",
            "reads a field that does not exist",
            Severity::Low,
            SafetyAction::Monitor,
            |_: &SafetyMetrics| Err(RuleError::Evaluation("missing field".into())),
        ))
        .await
        .unwrap();
    orchestrator
        .add_rule(ValidationRule::new(
            "panics",
            "panics on evaluation",
            Severity::Low,
            SafetyAction::Monitor,
            |_: &SafetyMetrics| -> Result<bool, RuleError> { panic!("rule bug") },
        ))
        .await
        .unwrap();

    let result = orchestrator.run_validation().await;
    assert!(!result.success);
    assert_eq!(result.details.rules_evaluated, 5);
    assert_eq!(result.details.passed_rules.len(), 3);
    assert!(result.violated("broken"));
    assert!(result.violated("panics"));
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().any(|e| e.contains("missing field")));
    assert!(result.errors.iter().any(|e| e.contains("panicked")));
}

#[tokio::test]
async fn test_slow_rule_times_out() {
    let config = ValidationConfig {
        rule_timeout_ms: 50,
        ..Default::default()
    };
    let (orchestrator, _) = orchestrator(config);
    orchestrator
        .add_rule(ValidationRule::from_predicate(
            "sleepy",
            "blocks past the timeout",
            Severity::Medium,
            SafetyAction::Warn,
            |_| {
                std::thread::sleep(Duration::from_millis(500));
                true
            },
        ))
        .await
        .unwrap();

    let result = orchestrator.run_validation().await;
    assert!(!result.success);
    let violation = &result.details.violations[0];
    assert_eq!(violation.rule, "sleepy");
    assert!(violation.error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_metrics_failure_degrades_to_default_snapshot() {
    let orchestrator =
        ValidationOrchestrator::new(ValidationConfig::default(), Arc::new(FailingSource)).unwrap();

    let result = orchestrator.run_validation().await;
    assert!(result.success);
    assert!(result.details.metrics_degraded);
    assert_eq!(result.metrics, SafetyMetrics::default());
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("collector offline"));
}

#[tokio::test]
async fn test_rule_management() {
    let (orchestrator, _) = orchestrator(ValidationConfig::default());
    let rule = || {
        ValidationRule::from_predicate(
            "score_floor",
            "score above 0.5",
            Severity::High,
            SafetyAction::Throttle,
            |m| m.safety_score >= 0.5,
        )
    };

    orchestrator.add_rule(rule()).await.unwrap();
    assert!(matches!(
        orchestrator.add_rule(rule()).await,
        Err(ValidationError::DuplicateRule(_))
    ));
    assert_eq!(orchestrator.rules().await.len(), 4);

    assert!(orchestrator.set_rule_enabled(PERFORMANCE_RULE, false).await);
    let status = orchestrator.get_validation_status().await;
    assert_eq!(status.total_rules, 4);
    assert_eq!(status.enabled_rules, 3);
    assert_eq!(orchestrator.run_validation().await.details.rules_evaluated, 3);

    assert!(orchestrator.remove_rule("score_floor").await);
    assert!(!orchestrator.remove_rule("score_floor").await);
    assert!(!orchestrator.set_rule_enabled("score_floor", true).await);
    assert_eq!(orchestrator.rules().await.len(), 3);
}

#[tokio::test]
async fn test_history_is_bounded() {
    let config = ValidationConfig {
        history_capacity: 3,
        ..Default::default()
    };
    let (orchestrator, _) = orchestrator(config);

    let first = orchestrator.run_validation().await;
    for _ in 0..3 {
        orchestrator.run_validation().await;
    }

    let history = orchestrator.history().await;
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|r| r.id != first.id));

    let status = orchestrator.get_validation_status().await;
    assert_eq!(status.recent_validations, 3);
    assert_eq!(status.recent_success_rate, Some(1.0));
    assert_eq!(status.last_validation_at, history.last().map(|r| r.timestamp));
}

#[tokio::test]
async fn test_status_success_rate() {
    let (orchestrator, controller) = orchestrator(ValidationConfig::default());
    let status = orchestrator.get_validation_status().await;
    assert_eq!(status.recent_validations, 0);
    assert_eq!(status.recent_success_rate, None);
    assert!(status.last_validation_at.is_none());

    orchestrator.run_validation().await;
    controller
        .register_event(TriggerKind::PerformanceDegradation, Severity::High, EventDetails::new())
        .unwrap();
    orchestrator.run_validation().await;

    let status = orchestrator.get_validation_status().await;
    assert_eq!(status.recent_validations, 2);
    assert_eq!(status.recent_success_rate, Some(0.5));
}

#[tokio::test]
async fn test_no_auto_start_rejects() {
    let config = ValidationConfig {
        auto_start: false,
        ..Default::default()
    };
    let (orchestrator, _) = orchestrator(config);
    let result = orchestrator.run_validation().await;
    assert!(!result.success);
    assert!(result.errors[0].contains("not running"));
    assert!(orchestrator.history().await.is_empty());

    orchestrator.start().await;
    assert!(orchestrator.run_validation().await.success);
}

#[tokio::test]
async fn test_reset_restores_defaults() {
    let (orchestrator, _) = orchestrator(ValidationConfig::default());
    orchestrator
        .add_rule(ValidationRule::from_predicate(
            "extra",
            "always holds",
            Severity::Low,
            SafetyAction::None,
            |_| true,
        ))
        .await
        .unwrap();
    orchestrator.remove_rule(ERROR_SPIKE_RULE).await;
    orchestrator.run_validation().await;

    orchestrator.reset().await;
    assert!(!orchestrator.is_running());
    assert!(orchestrator.history().await.is_empty());
    let names: Vec<_> = orchestrator.rules().await.into_iter().map(|r| r.name).collect();
    assert_eq!(
        names,
        vec!["performance_degradation", "error_spike", "resource_exhaustion"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_all_recorded() {
    let (orchestrator, controller) = orchestrator(ValidationConfig::default());
    let orchestrator = Arc::new(orchestrator);
    orchestrator.start().await;

    let producer = {
        let controller = controller.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                controller
                    .register_event(TriggerKind::MemoryLeak, Severity::Low, EventDetails::new())
                    .unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let runs = (0..12).map(|_| {
        let orchestrator = orchestrator.clone();
        async move { orchestrator.run_validation().await }
    });
    let results = futures::future::join_all(runs).await;
    producer.await.unwrap();

    assert!(results.iter().all(|r| r.success));
    assert_eq!(orchestrator.history().await.len(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_background_loop_runs_on_interval() {
    let (orchestrator, _) = orchestrator(ValidationConfig::default());
    orchestrator.start().await;

    tokio::time::sleep(Duration::from_secs(95)).await;
    let status = orchestrator.get_validation_status().await;
    assert_eq!(status.history_len, 3);

    assert!(orchestrator.stop().await);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(orchestrator.get_validation_status().await.history_len, 3);
    assert!(!orchestrator.stop().await);
}

/// Fails the first `failures` fetches, then reports empty metrics.
struct FlakySource {
    failures: usize,
    calls: AtomicUsize,
}

impl FlakySource {
    fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for FlakySource {
    async fn fetch_metrics(&self) -> OrchestratorResult<SafetyMetrics> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(ValidationError::MetricsUnavailable("flaky".into()));
        }
        Ok(SafetyMetrics::default())
    }
}

#[tokio::test(start_paused = true)]
async fn test_degraded_run_retries_after_backoff() {
    let source = FlakySource::failing(usize::MAX);
    let orchestrator =
        ValidationOrchestrator::new(ValidationConfig::default(), source.clone()).unwrap();
    orchestrator.start().await;

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(source.calls(), 1);

    // Retries follow the 10s backoff rather than the 30s interval.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.calls(), 2);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.calls(), 3);

    let history = orchestrator.history().await;
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|r| r.details.metrics_degraded));
    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_loop_returns_to_interval_after_recovery() {
    let source = FlakySource::failing(2);
    let orchestrator =
        ValidationOrchestrator::new(ValidationConfig::default(), source.clone()).unwrap();
    orchestrator.start().await;

    // Failures at 30s and 40s, recovered retry at 50s, next tick at 80s.
    tokio::time::sleep(Duration::from_secs(75)).await;
    assert_eq!(source.calls(), 3);
    let last = orchestrator.last_result().await.unwrap();
    assert!(!last.details.metrics_degraded);
    assert!(last.success);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.calls(), 4);
    orchestrator.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_interrupts_backoff() {
    let source = FlakySource::failing(usize::MAX);
    let orchestrator =
        ValidationOrchestrator::new(ValidationConfig::default(), source.clone()).unwrap();
    orchestrator.start().await;

    tokio::time::sleep(Duration::from_secs(32)).await;
    assert!(orchestrator.stop().await);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_huge_recent_window_counts_all_history() {
    for recent_window_secs in [10_000_000_000_000, u64::MAX] {
        let config = ValidationConfig {
            recent_window_secs,
            ..Default::default()
        };
        let (orchestrator, _) = orchestrator(config);
        orchestrator.run_validation().await;
        orchestrator.run_validation().await;

        let status = orchestrator.get_validation_status().await;
        assert_eq!(status.recent_validations, 2);
        assert_eq!(status.recent_success_rate, Some(1.0));
    }
}

#[tokio::test]
async fn test_rule_lookup() {
    let (orchestrator, _) = orchestrator(ValidationConfig::default());
    let info = orchestrator.rule(ERROR_SPIKE_RULE).await.unwrap();
    assert_eq!(info.severity, Severity::High);
    assert_eq!(info.action, SafetyAction::Warn);

    assert!(matches!(
        orchestrator.rule("missing").await,
        Err(ValidationError::RuleNotFound(name)) if name == "missing"
    ));
}
