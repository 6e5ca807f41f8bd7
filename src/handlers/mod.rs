pub mod auth;
pub mod health;
pub mod user;

use crate::error::AppError;

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::not_found("Resource not found")
}
