//! Engine configuration
//!
//! Loaded once at startup from JSON; every field has a default so an empty
//! object is a valid configuration. Validation runs on every load path.
//! Loading from a file also applies the logging section to the
//! process-wide logger; nothing else touches it.
//!
//! ```json
//! {
//!   "planner":  { "index_scans_enabled": true },
//!   "executor": { "cancel_check_interval": 64 },
//!   "logging":  { "min_severity": "INFO", "enabled": true }
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Error code: CINDER_CONFIG_INVALID (FATAL at startup)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            message: reason.into(),
        }
    }

    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        "CINDER_CONFIG_INVALID"
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Plan selection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// When false every scan plans as a table scan.
    pub index_scans_enabled: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            index_scans_enabled: true,
        }
    }
}

/// Scan execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Rows pulled from storage between two cancellation checks.
    pub cancel_check_interval: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            cancel_check_interval: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub min_severity: Severity,
    pub enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
            enabled: true,
        }
    }
}

impl LoggingConfig {
    /// Applies the settings to the process-wide logger
    pub fn apply(&self) {
        Logger::set_enabled(self.enabled);
        Logger::set_min_severity(self.min_severity);
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub planner: PlannerConfig,
    pub executor: ExecutorConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Parses and validates a JSON document
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| ConfigError::invalid(format!("Malformed configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file, then applies its logging
    /// settings
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            ConfigError::invalid(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json_str(&json)?;
        config.logging.apply();
        let shown = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", shown.as_str())]);
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.executor.cancel_check_interval == 0 {
            return Err(ConfigError::invalid(
                "executor.cancel_check_interval must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Configuration with index scans switched off
    pub fn without_index_scans() -> Self {
        Self {
            planner: PlannerConfig {
                index_scans_enabled: false,
            },
            ..Self::default()
        }
    }
}
