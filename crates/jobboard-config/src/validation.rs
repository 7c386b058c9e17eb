//! Configuration validation module.
//!
//! Collects every problem in one pass so an operator sees the full list at
//! startup instead of fixing one field per restart.

use crate::{AppConfig, CacheConfig, ObservabilityConfig};
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Pool size outside the accepted range.
    PoolSizeOutOfRange { value: usize, minimum: usize, maximum: usize },
    /// Timeout or TTL value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Reconnect base delay exceeds its cap.
    InvalidBackoff { base_delay_ms: u64, max_delay_ms: u64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::PoolSizeOutOfRange { value, minimum, maximum } => {
                write!(
                    f,
                    "Pool size {} out of range (must be between {} and {})",
                    value, minimum, maximum
                )
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "'{}' must be positive, got {}", name, value)
            }
            Self::InvalidBackoff { base_delay_ms, max_delay_ms } => {
                write!(
                    f,
                    "Reconnect base delay ({}ms) cannot exceed max delay ({}ms)",
                    base_delay_ms, max_delay_ms
                )
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Accepted Redis URL schemes.
    const REDIS_SCHEMES: &'static [&'static str] = &["redis", "rediss", "redis+unix", "unix"];

    /// Validates the entire application configuration.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::default();

        Self::validate_cache(&config.cache, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        result.into_result()
    }

    /// Validates cache configuration.
    ///
    /// TTLs are checked even without an endpoint so enabling the cache later
    /// cannot surface a latent misconfiguration.
    fn validate_cache(config: &CacheConfig, result: &mut ValidationResult) {
        if let Some(endpoint) = config.endpoint() {
            match Url::parse(endpoint) {
                Ok(url) if Self::REDIS_SCHEMES.contains(&url.scheme()) => {}
                Ok(url) => result.add_error(ConfigValidationError::InvalidUrl {
                    url_type: "cache".to_string(),
                    message: format!("unsupported scheme '{}'", url.scheme()),
                }),
                Err(e) => result.add_error(ConfigValidationError::InvalidUrl {
                    url_type: "cache".to_string(),
                    message: e.to_string(),
                }),
            }

            if config.pool_size == 0 || config.pool_size > Self::MAX_POOL_SIZE {
                result.add_error(ConfigValidationError::PoolSizeOutOfRange {
                    value: config.pool_size,
                    minimum: 1,
                    maximum: Self::MAX_POOL_SIZE,
                });
            }
        }

        let positive = [
            ("cache.connect_timeout_ms", config.connect_timeout_ms),
            ("cache.wait_timeout_ms", config.wait_timeout_ms),
            ("cache.health_check_interval_ms", config.health_check_interval_ms),
            ("cache.list_ttl_secs", config.list_ttl_secs),
            ("cache.detail_ttl_secs", config.detail_ttl_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                result.add_error(ConfigValidationError::NonPositiveTimeout {
                    name: name.to_string(),
                    value,
                });
            }
        }

        let reconnect = &config.reconnect;
        if reconnect.base_delay_ms > reconnect.max_delay_ms {
            result.add_error(ConfigValidationError::InvalidBackoff {
                base_delay_ms: reconnect.base_delay_ms,
                max_delay_ms: reconnect.max_delay_ms,
            });
        }
    }

    /// Validates observability configuration.
    fn validate_observability(config: &ObservabilityConfig, result: &mut ValidationResult) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }
    }
}
