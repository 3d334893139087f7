use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::matching::MatchError;

/// Failure reading or writing the persistent store.
/// Always surfaced to the caller; a failed write has already been rolled back.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Matching(#[from] MatchError),

    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Matching(err) => {
                if let Some(key) = err.code() {
                    let status = match err {
                        MatchError::VacancyNotFound => StatusCode::NOT_FOUND,
                        _ => StatusCode::UNPROCESSABLE_ENTITY,
                    };
                    return (status, Json(json!({ "error": key }))).into_response();
                }
                match err {
                    MatchError::Storage(e) => {
                        tracing::error!("Storage error: {e}");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "STORAGE_ERROR",
                            "A storage error occurred".to_string(),
                        )
                    }
                    MatchError::Reasoning(e) => {
                        tracing::error!("LLM error: {e}");
                        (
                            StatusCode::BAD_GATEWAY,
                            "LLM_ERROR",
                            "An AI processing error occurred".to_string(),
                        )
                    }
                    _ => {
                        tracing::error!("Internal error: {err:?}");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "INTERNAL_ERROR",
                            "An internal server error occurred".to_string(),
                        )
                    }
                }
            }
            AppError::Timeout(secs) => {
                tracing::warn!("Matching request exceeded {secs}s deadline");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    "Scoring took too long, please retry".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
