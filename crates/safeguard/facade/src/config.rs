//! Combined configuration.
//!
//! Layered in order: built-in defaults, an optional file, then environment
//! variables prefixed with `SAFEGUARD_`. Nested keys are separated by a
//! double underscore, e.g. `SAFEGUARD_VALIDATION__INTERVAL_SECS=10`.

use safeguard_controller::ControllerConfig;
use safeguard_validation::ValidationConfig;
use serde::{Deserialize, Serialize};

use crate::error::SafeguardResult;

/// Configuration for a [`Safeguard`](crate::Safeguard) instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafeguardConfig {
    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl SafeguardConfig {
    /// Load configuration, optionally from a file.
    ///
    /// A missing file is not an error.
    pub fn load(path: Option<&str>) -> SafeguardResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&SafeguardConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SAFEGUARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: SafeguardConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check both component configurations.
    pub fn validate(&self) -> SafeguardResult<()> {
        self.controller.validate()?;
        self.validation.validate()?;
        Ok(())
    }
}
