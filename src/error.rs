use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::{models::ErrorResponse, storage::StorageError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnSupportedMediaType(String),

    #[error("Multipart error: {0}")]
    MultipartError(String),

    #[error("{message}: {error}")]
    InternalServerError { message: String, error: String },
}

impl AppError {
    /// Internal error with a caller-facing message and the underlying cause.
    pub fn internal(message: &str, error: impl ToString) -> Self {
        AppError::InternalServerError {
            message: message.to_string(),
            error: error.to_string(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => AppError::NotFound(format!("\"{}\" not found", what)),
            StorageError::InvalidName(name) => {
                AppError::BadRequest(format!("Invalid folder name \"{}\"", name))
            }
            other => AppError::internal("Storage error", other),
        }
    }
}

/// Convert `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        // Oversized parts and wrong content types are client input errors too
        let (status, message, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::PayloadTooLarge(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::UnSupportedMediaType(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::MultipartError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::InternalServerError { message, error } => {
                tracing::error!("{}: {}", message, error);
                (StatusCode::INTERNAL_SERVER_ERROR, message, Some(error))
            }
        };

        // Return standardized JSON error response
        let body = Json(ErrorResponse {
            success: false,
            message,
            error,
        });
        (status, body).into_response()
    }
}
