//! Resilience configuration.
//!
//! Every option is optional. Keys are camelCase so a configuration file reads
//! the same as the options documented for the host runtime plugin:
//!
//! ```yaml
//! enableLogging: true
//! fallbackTimeout: 5000        # ms, or a humantime string such as "5s"
//! retryAttempts: 2
//! retryDelay: 1s
//! enableCircuitBreaker: true
//! circuitBreakerThreshold: 3
//! circuitBreakerResetTimeout: 1m
//! fallbackArtifacts:
//!   checkout:
//!     title: "Checkout is temporarily unavailable"
//! alternateSources:
//!   checkout: "https://backup.example.com/checkout/descriptor.json"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the resilience engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResilienceConfig {
    /// Emit diagnostic logs for failures, successes and circuit transitions
    pub enable_logging: bool,

    /// Per-attempt timeout for retried operations
    #[serde(with = "duration_millis")]
    pub fallback_timeout: Duration,

    /// Attempts per retried operation
    pub retry_attempts: u32,

    /// Base backoff unit, scaled linearly by attempt index
    #[serde(with = "duration_millis")]
    pub retry_delay: Duration,

    /// Toggle circuit breaking entirely
    pub enable_circuit_breaker: bool,

    /// Consecutive failures before a circuit opens
    pub circuit_breaker_threshold: u32,

    /// Time an open circuit waits before its blind reset
    #[serde(with = "duration_millis")]
    pub circuit_breaker_reset_timeout: Duration,

    /// Caller-supplied substitute per remote, overriding the generic default
    pub fallback_artifacts: HashMap<String, serde_json::Value>,

    /// Fixed alternate descriptor URL per remote
    pub alternate_sources: HashMap<String, String>,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            fallback_timeout: Duration::from_millis(5000),
            retry_attempts: 2,
            retry_delay: Duration::from_millis(1000),
            enable_circuit_breaker: true,
            circuit_breaker_threshold: 3,
            circuit_breaker_reset_timeout: Duration::from_millis(60_000),
            fallback_artifacts: HashMap::new(),
            alternate_sources: HashMap::new(),
        }
    }
}

impl ResilienceConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ResilienceConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ResilienceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a file, choosing the format from its extension (YAML otherwise).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path)?,
            _ => Self::from_yaml_file(path)?,
        };
        if config.enable_logging {
            tracing::debug!(path = %path.display(), "Loaded resilience config");
        }
        Ok(config)
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retryAttempts must be at least 1".to_string(),
            ));
        }

        if self.circuit_breaker_threshold == 0 {
            return Err(ConfigError::Invalid(
                "circuitBreakerThreshold must be at least 1".to_string(),
            ));
        }

        if self.fallback_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "fallbackTimeout must be greater than zero".to_string(),
            ));
        }

        if let Some((remote, _)) = self
            .alternate_sources
            .iter()
            .find(|(_, url)| url.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "alternateSources.{} must not be empty",
                remote
            )));
        }

        Ok(())
    }

    /// Set the breaker threshold.
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.circuit_breaker_threshold = threshold;
        self
    }

    /// Set the breaker reset timeout.
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.circuit_breaker_reset_timeout = timeout;
        self
    }

    /// Enable or disable circuit breaking.
    pub fn with_circuit_breaker(mut self, enabled: bool) -> Self {
        self.enable_circuit_breaker = enabled;
        self
    }

    /// Set retry attempts, base delay and per-attempt timeout.
    pub fn with_retry(mut self, attempts: u32, delay: Duration, timeout: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self.fallback_timeout = timeout;
        self
    }

    /// Register a substitute artifact for a remote.
    pub fn with_fallback(mut self, remote_id: impl Into<String>, payload: serde_json::Value) -> Self {
        self.fallback_artifacts.insert(remote_id.into(), payload);
        self
    }

    /// Register an alternate descriptor URL for a remote.
    pub fn with_alternate_source(
        mut self,
        remote_id: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        self.alternate_sources.insert(remote_id.into(), url.into());
        self
    }

    /// Enable or disable diagnostic logging.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }
}

/// Durations as integer milliseconds, also accepting humantime strings.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Human(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Ok(Duration::from_millis(ms)),
            Raw::Human(text) => humantime::parse_duration(text.trim())
                .map_err(|e| serde::de::Error::custom(format!("invalid duration '{}': {}", text, e))),
        }
    }
}
