//! Cache error types.
//!
//! None of these cross the cache layer's public read/invalidate surface; they
//! exist so internal failures can be logged with a precise cause before being
//! turned into a miss or a no-op.

use jobboard_core::JobBoardError;
use thiserror::Error;

/// Result type for cache-internal operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend is not in the ready state.
    #[error("Cache backend unavailable")]
    BackendUnavailable,

    /// A value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resolving or deleting the keys under a pattern failed.
    #[error("Pattern delete failed for '{pattern}': {message}")]
    PatternDeleteFailure { pattern: String, message: String },

    /// Redis command error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Namespace cannot be used to build keys or patterns.
    #[error("Invalid namespace '{namespace}': {reason}")]
    InvalidNamespace {
        namespace: String,
        reason: &'static str,
    },

    /// List query parameters out of range.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Backend could not be constructed from its configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Returns true if this error means the backend itself is unreachable,
    /// as opposed to a problem with one particular command or value.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::BackendUnavailable | Self::Pool(_) => true,
            Self::Redis(err) => {
                err.is_io_error()
                    || err.is_connection_dropped()
                    || err.is_connection_refusal()
                    || err.is_timeout()
            }
            Self::PatternDeleteFailure { .. }
            | Self::Serialization(_)
            | Self::InvalidNamespace { .. }
            | Self::InvalidQuery(_)
            | Self::Configuration(_) => false,
        }
    }
}

impl From<CacheError> for JobBoardError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidQuery(message) => JobBoardError::Validation(message),
            CacheError::Configuration(message) => JobBoardError::Configuration(message),
            other => JobBoardError::Cache(other.to_string()),
        }
    }
}
