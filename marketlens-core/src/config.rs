//! Runtime configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid config.
//!
//! ```toml
//! [provider]
//! timeout_secs = 30
//! max_retries = 3
//!
//! [circuit_breaker]
//! cooldown_secs = 1800
//!
//! [resolver]
//! window_days = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::data::circuit_breaker::CircuitBreaker;
use crate::data::provider::DataError;
use crate::data::resolver::DEFAULT_WINDOW_DAYS;

const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketLensConfig {
    pub provider: ProviderConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub resolver: ResolverConfig,
}

impl MarketLensConfig {
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::ConfigError(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DataError::ConfigError(format!("parse config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DataError> {
        if self.provider.timeout_secs == 0 {
            return Err(DataError::ConfigError("provider.timeout_secs must be positive".into()));
        }
        if self.provider.user_agent.trim().is_empty() {
            return Err(DataError::ConfigError("provider.user_agent must not be empty".into()));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(DataError::ConfigError(
                "circuit_breaker.failure_threshold must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP client settings for the Yahoo Finance provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub base_delay_ms: u64,
    pub user_agent: String,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub cooldown_secs: u64,
    pub failure_threshold: u32,
}

impl CircuitBreakerConfig {
    pub fn build(&self) -> CircuitBreaker {
        CircuitBreaker::new(Duration::from_secs(self.cooldown_secs), self.failure_threshold)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 30 * 60,
            failure_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Half-width of the window fetched around a target date.
    pub window_days: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}
