//! Unified error types for all layers of the application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for Jobboard.
///
/// Cache-internal failures never reach this type on the read path; the cache
/// layer recovers them locally. `Cache` exists for configuration and startup
/// problems (e.g. an unparsable Redis URL) that must stop the process.
#[derive(Error, Debug)]
pub enum JobBoardError {
    // ============ Domain Errors ============
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict error (e.g., duplicate entry)
    #[error("Conflict: {0}")]
    Conflict(String),

    // ============ Infrastructure Errors ============
    /// Source-of-truth datastore error
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Redis/Cache error
    #[error("Cache error: {0}")]
    Cache(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobBoardError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a database error.
    #[must_use]
    pub fn database<T: Into<String>>(message: T) -> Self {
        Self::Database(message.into())
    }

    /// Checks if this error is retriable.
    ///
    /// Only infrastructure failures qualify; domain errors are deterministic.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Cache(_))
    }
}

impl From<serde_json::Error> for JobBoardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}

/// Field-level validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name
    pub field: String,
    /// Error message
    pub message: String,
    /// Error code
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(JobBoardError::not_found("Job", 1).error_code(), "NOT_FOUND");
        assert_eq!(JobBoardError::validation("bad").error_code(), "VALIDATION_ERROR");
        assert_eq!(JobBoardError::Cache("x".to_string()).error_code(), "CACHE_ERROR");
        assert_eq!(
            JobBoardError::Internal("oops".to_string()).error_code(),
            "INTERNAL_ERROR"
        );
        assert_eq!(
            JobBoardError::Configuration("missing".to_string()).error_code(),
            "CONFIGURATION_ERROR"
        );
    }

    #[test]
    fn test_retriable_errors() {
        assert!(JobBoardError::database("connection lost").is_retriable());
        assert!(JobBoardError::Cache("pool exhausted".to_string()).is_retriable());
        assert!(!JobBoardError::not_found("Job", 1).is_retriable());
        assert!(!JobBoardError::validation("bad input").is_retriable());
        assert!(!JobBoardError::conflict("duplicate").is_retriable());
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let converted = JobBoardError::from(err);
        assert_eq!(converted.error_code(), "INTERNAL_ERROR");
        assert!(converted.to_string().contains("JSON"));
    }

    #[test]
    fn test_other_wraps_anyhow() {
        let err: JobBoardError = anyhow::anyhow!("boom").into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert_eq!(err.to_string(), "boom");
    }
}
