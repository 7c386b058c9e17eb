//! Request validation helpers.

use crate::{FieldError, JobBoardError};
use validator::{Validate, ValidationErrors};

/// Extension trait turning `validator` failures into [`JobBoardError`].
pub trait ValidateExt: Validate {
    /// Validates the struct and returns a `JobBoardError::Validation` on failure.
    fn validate_request(&self) -> Result<(), JobBoardError> {
        self.validate().map_err(validation_errors_to_jobboard_error)
    }
}

impl<T: Validate> ValidateExt for T {}

/// Flattens field errors into `FieldError`s.
#[must_use]
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: (*field).to_string(),
                message: error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string),
                code: error.code.to_string(),
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

/// Converts `validator::ValidationErrors` to `JobBoardError`.
#[must_use]
pub fn validation_errors_to_jobboard_error(errors: ValidationErrors) -> JobBoardError {
    let message = field_errors(&errors)
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");

    JobBoardError::Validation(message)
}

/// Custom validation rules.
pub mod rules {
    use validator::ValidationError;

    /// Rejects strings that are empty after trimming.
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("not_blank"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 2, message = "too short"))]
        name: String,
        #[validate(custom(function = "rules::not_blank"))]
        title: String,
    }

    #[test]
    fn test_valid_request() {
        let sample = Sample {
            name: "ok".to_string(),
            title: "Engineer".to_string(),
        };
        assert!(sample.validate_request().is_ok());
    }

    #[test]
    fn test_invalid_request_lists_fields() {
        let sample = Sample {
            name: "x".to_string(),
            title: "   ".to_string(),
        };
        let err = sample.validate_request().unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        let message = err.to_string();
        assert!(message.contains("name: too short"));
        assert!(message.contains("title: not_blank"));
    }

    #[test]
    fn test_not_blank() {
        assert!(rules::not_blank("a").is_ok());
        assert!(rules::not_blank(" \t").is_err());
    }
}
