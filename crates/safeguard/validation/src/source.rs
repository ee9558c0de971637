//! Metrics sources the orchestrator validates against.

use async_trait::async_trait;
use safeguard_controller::SafetyEventController;
use safeguard_types::SafetyMetrics;

use crate::error::OrchestratorResult;

/// Supplier of metrics snapshots.
///
/// The orchestrator only reads through this seam; it never mutates the
/// system it validates.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Make sure the source is producing metrics.
    async fn ensure_running(&self) {}

    /// Fetch a point-in-time copy of the metrics.
    async fn fetch_metrics(&self) -> OrchestratorResult<SafetyMetrics>;
}

#[async_trait]
impl MetricsSource for SafetyEventController {
    async fn ensure_running(&self) {
        self.start();
    }

    async fn fetch_metrics(&self) -> OrchestratorResult<SafetyMetrics> {
        Ok(self.get_metrics())
    }
}
