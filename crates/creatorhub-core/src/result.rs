//! Convenience result type alias for CreatorHub.

use crate::error::AppError;

/// A specialized `Result` type for CreatorHub operations.
pub type AppResult<T> = Result<T, AppError>;
