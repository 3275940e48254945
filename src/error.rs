//! API error envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::similarity::{ranker::RankError, SimilarityError};
use crate::store::StoreError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request was well-formed but the referenced audio cannot be
    /// processed (422)
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(format!("riff not found: {id}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SimilarityError> for ApiError {
    fn from(err: SimilarityError) -> Self {
        match err {
            SimilarityError::TargetNotFound(id) => {
                ApiError::NotFound(format!("riff not found: {id}"))
            }
            SimilarityError::TargetUnusable(e) => {
                ApiError::Unprocessable(format!("failed to analyze target riff: {e}"))
            }
            SimilarityError::Rank(RankError::EmptyCandidateSet) => {
                ApiError::Internal("no riff in the catalog could be analyzed".to_string())
            }
            SimilarityError::Rank(e) => ApiError::Internal(e.to_string()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
