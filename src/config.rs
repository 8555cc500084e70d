//! Router configuration
//!
//! Every field is optional with a stated default, so `RouterConfig::default()`
//! is a fully working configuration. A TOML loader is provided for deployments
//! that configure the router from a file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Router configuration surface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterConfig {
    /// Agent used by the default pass and as the fallback chain
    #[serde(default)]
    pub default_agent_id: Option<String>,
    /// Damp capability scores by reported agent load
    #[serde(default = "default_true")]
    pub enable_load_balancing: bool,
    /// Engage the fallback coordinator after a primary failure
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    /// Global request timeout in milliseconds (per-agent overrides win)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Attempts per fallback agent
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Cumulative fallback failures before the circuit opens
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    /// How long an open circuit waits before admitting a trial call, in milliseconds
    #[serde(default = "default_circuit_breaker_reset_timeout_ms")]
    pub circuit_breaker_reset_timeout_ms: u64,
    /// Fixed delay between retry attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Gate fallback attempts through the circuit breaker
    #[serde(default = "default_true")]
    pub enable_circuit_breaker: bool,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_circuit_breaker_threshold() -> u32 {
    5
}

fn default_circuit_breaker_reset_timeout_ms() -> u64 {
    30_000
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_agent_id: None,
            enable_load_balancing: true,
            enable_fallback: true,
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            circuit_breaker_reset_timeout_ms: default_circuit_breaker_reset_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            enable_circuit_breaker: true,
        }
    }
}

impl RouterConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: RouterConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.circuit_breaker_threshold == 0 {
            return Err(ConfigError::InvalidConfig(
                "circuit_breaker_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn circuit_breaker_reset_timeout(&self) -> Duration {
        Duration::from_millis(self.circuit_breaker_reset_timeout_ms)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
