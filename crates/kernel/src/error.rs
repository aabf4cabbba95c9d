//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application errors.
///
/// Partial failure of a bulk operation is not an error: `publish_all` and
/// `discard_all` always return a [`crate::publish::BatchReport`] carrying
/// per-item outcomes.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("not found")]
    NotFound,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("publish failed")]
    PublishFailed(#[source] anyhow::Error),

    #[error("discard failed")]
    DiscardFailed(#[source] anyhow::Error),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PublishFailed(_) | AppError::DiscardFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Log server-side failures with detail; keep response bodies vague
        // for anything that is not the caller's fault.
        let body = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "internal server error".to_string()
            }
            AppError::PublishFailed(e) => {
                tracing::error!(error = %e, "publish failed");
                self.to_string()
            }
            AppError::DiscardFailed(e) => {
                tracing::error!(error = %e, "discard failed");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
