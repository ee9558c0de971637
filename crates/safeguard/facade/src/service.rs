//! Controller and orchestrator wired together.

use std::sync::Arc;

use safeguard_controller::{Clock, ControllerHealth, SafetyEventController, SystemClock};
use safeguard_validation::{ValidationOrchestrator, ValidationStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SafeguardConfig;
use crate::error::SafeguardResult;

/// Combined health of both components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeguardHealth {
    pub controller: ControllerHealth,
    pub validation: ValidationStatus,
}

/// A safety event controller validated by an orchestrator.
///
/// The orchestrator reads its metrics from the controller it is built
/// with; both are shared through `Arc` so callers may hold either.
#[derive(Debug)]
pub struct Safeguard {
    config: SafeguardConfig,
    controller: Arc<SafetyEventController>,
    orchestrator: Arc<ValidationOrchestrator>,
}

impl Safeguard {
    /// Build a stopped instance on the system clock.
    pub fn new(config: SafeguardConfig) -> SafeguardResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Build a stopped instance with an explicit controller clock.
    pub fn with_clock(config: SafeguardConfig, clock: Arc<dyn Clock>) -> SafeguardResult<Self> {
        config.validate()?;

        let controller = Arc::new(SafetyEventController::with_clock(
            config.controller.clone(),
            clock,
        )?);
        let orchestrator = Arc::new(ValidationOrchestrator::for_controller(
            config.validation.clone(),
            controller.clone(),
        )?);

        Ok(Self {
            config,
            controller,
            orchestrator,
        })
    }

    pub fn config(&self) -> &SafeguardConfig {
        &self.config
    }

    pub fn controller(&self) -> &Arc<SafetyEventController> {
        &self.controller
    }

    pub fn orchestrator(&self) -> &Arc<ValidationOrchestrator> {
        &self.orchestrator
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running() && self.orchestrator.is_running()
    }

    /// Start the controller and the background validation loop.
    pub async fn start(&self) {
        self.controller.start();
        self.orchestrator.start().await;
        info!("Safeguard started");
    }

    /// Stop validation first, then the controller.
    pub async fn stop(&self) {
        self.orchestrator.stop().await;
        self.controller.stop();
        info!("Safeguard stopped");
    }

    pub async fn health(&self) -> SafeguardHealth {
        SafeguardHealth {
            controller: self.controller.health_check(),
            validation: self.orchestrator.get_validation_status().await,
        }
    }
}
