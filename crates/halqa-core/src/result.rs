//! Convenience result type alias for Halqa.

use crate::error::AppError;

/// A specialized `Result` type for Halqa operations.
pub type AppResult<T> = Result<T, AppError>;
