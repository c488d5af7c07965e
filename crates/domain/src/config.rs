//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_TIMEOUT_MS, DEFAULT_CACHE_TTL_MS, DEFAULT_HEALTH_PATH, DEFAULT_MAX_REPLAY_ATTEMPTS,
    DEFAULT_PROBE_INTERVAL_MS, DEFAULT_RETRY_INITIAL_DELAY_MS, DEFAULT_RETRY_MAX_ATTEMPTS,
    DEFAULT_RETRY_MAX_DELAY_MS,
};
use crate::errors::{ClubhouseError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub queue: QueueConfig,
    pub connectivity: ConnectivityConfig,
    pub logging: LoggingConfig,
}

/// Remote club API
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub health_path: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("health_path", &self.health_path)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_ms: DEFAULT_API_TIMEOUT_MS,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            token: None,
        }
    }
}

/// Default retry policy for mutating calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_RETRY_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

/// Stale snapshot cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub default_ttl_ms: u64,
    /// SQLite file for snapshots; in-memory when unset
    pub database_path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { default_ttl_ms: DEFAULT_CACHE_TTL_MS, database_path: None }
    }
}

/// Offline operation queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_replay_attempts: u32,
    /// `None` for unbounded
    pub capacity: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_replay_attempts: DEFAULT_MAX_REPLAY_ATTEMPTS, capacity: None }
    }
}

/// Health probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub probe_interval_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self { probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS }
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

impl Config {
    /// Check value ranges; URL syntax is checked by the loader
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ClubhouseError::Config("api.base_url must not be empty".into()));
        }
        if self.api.timeout_ms == 0 {
            return Err(ClubhouseError::Config("api.timeout_ms must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ClubhouseError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ClubhouseError::Config(
                "retry.max_delay_ms must not be below retry.initial_delay_ms".into(),
            ));
        }
        if self.cache.default_ttl_ms == 0 {
            return Err(ClubhouseError::Config("cache.default_ttl_ms must be positive".into()));
        }
        if self.queue.max_replay_attempts == 0 {
            return Err(ClubhouseError::Config(
                "queue.max_replay_attempts must be at least 1".into(),
            ));
        }
        if self.queue.capacity == Some(0) {
            return Err(ClubhouseError::Config("queue.capacity must be at least 1".into()));
        }
        if self.connectivity.probe_interval_ms == 0 {
            return Err(ClubhouseError::Config(
                "connectivity.probe_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
