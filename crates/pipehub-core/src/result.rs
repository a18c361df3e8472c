//! Convenience result type alias for PipeHub.

use crate::error::AppError;

/// A specialized `Result` type for PipeHub operations.
pub type AppResult<T> = Result<T, AppError>;
