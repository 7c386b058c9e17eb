//! Result type aliases for Jobboard.

use crate::JobBoardError;

/// A specialized `Result` type for Jobboard operations.
pub type JobBoardResult<T> = Result<T, JobBoardError>;
