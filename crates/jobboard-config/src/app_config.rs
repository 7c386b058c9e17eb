//! Application configuration structures.

use jobboard_core::telemetry::LogFormat;
use jobboard_resilience::{RetryPolicy, RetryStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Cache (Redis) configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "jobboard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Cache configuration.
///
/// Leaving `url` unset (or empty) is a supported deployment: the cache layer
/// becomes a pass-through and every read goes to the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis URL, e.g. `redis://localhost:6379`.
    pub url: Option<String>,
    /// Maximum number of pooled connections.
    pub pool_size: usize,
    /// Timeout for establishing a new connection, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Timeout for waiting on a pooled connection, in milliseconds.
    pub wait_timeout_ms: u64,
    /// Interval between liveness checks while connected, in milliseconds.
    pub health_check_interval_ms: u64,
    /// TTL for paginated list entries, in seconds.
    pub list_ttl_secs: u64,
    /// TTL for single-entity entries, in seconds.
    pub detail_ttl_secs: u64,
    /// Reconnection backoff.
    pub reconnect: ReconnectConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 10,
            connect_timeout_ms: 1_000,
            wait_timeout_ms: 500,
            health_check_interval_ms: 5_000,
            list_ttl_secs: 300,
            detail_ttl_secs: 600,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Returns the configured endpoint, treating an empty string as absent.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Returns true if a cache endpoint is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.endpoint().is_some()
    }

    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the pool wait timeout as a Duration.
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Returns the health check interval as a Duration.
    #[must_use]
    pub const fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    /// Returns the list TTL as a Duration.
    #[must_use]
    pub const fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_secs)
    }

    /// Returns the detail TTL as a Duration.
    #[must_use]
    pub const fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }
}

/// Reconnection backoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Backoff strategy.
    pub strategy: RetryStrategy,
    /// Base delay in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds.
    pub max_delay_ms: u64,
    /// Maximum attempts per outage; `0` keeps trying forever.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Linear,
            base_delay_ms: 50,
            max_delay_ms: 2_000,
            max_attempts: 0,
        }
    }
}

impl ReconnectConfig {
    /// Builds the retry policy described by this configuration.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        let base = Duration::from_millis(self.base_delay_ms);
        let cap = Duration::from_millis(self.max_delay_ms);

        let policy = match self.strategy {
            RetryStrategy::Fixed => RetryPolicy::fixed(base),
            RetryStrategy::Linear => RetryPolicy::linear(base, cap),
            RetryStrategy::Exponential => RetryPolicy::exponential(base, cap),
        };

        policy.with_max_attempts(self.max_attempts)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (pretty, json).
    pub log_format: LogFormat,
    /// Enable metrics descriptions and recording.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
        }
    }
}
