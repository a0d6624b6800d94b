//! Configuration management for Timegate
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with TIMEGATE__)
//! - Configuration files (config/activation.toml, config/activation.yaml)
//! - Default values

use crate::clock::{Clock, FixedClock, SystemClock};
use chrono::{DateTime, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Main activation configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActivationConfig {
    /// Clock configuration
    #[serde(default)]
    pub clock: ClockConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClockConfig {
    /// Freeze "now" at this instant (RFC 3339). Unset means wall-clock time.
    pub frozen_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

// Default value functions
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

impl ActivationConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/activation").required(false))

            // Load local overrides
            .add_source(File::with_name("config/activation.local").required(false))

            // Load from environment variables with TIMEGATE__ prefix
            // e.g., TIMEGATE__CLOCK__FROZEN_AT=2024-06-01T12:00:00Z
            .add_source(
                Environment::with_prefix("TIMEGATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("TIMEGATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Build the clock this configuration describes
    pub fn clock(&self) -> Arc<dyn Clock> {
        match self.clock.frozen_at {
            Some(at) => Arc::new(FixedClock::new(at)),
            None => Arc::new(SystemClock),
        }
    }
}
