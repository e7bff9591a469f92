//! Platform Error Types

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authorization error: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A batched fetch failed; every waiter of the batch receives the same error.
    #[error("Batch load failed: {0}")]
    BatchLoad(Arc<PlatformError>),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// HTTP status and stable error code for this error.
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            PlatformError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            PlatformError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            PlatformError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            PlatformError::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            PlatformError::BatchLoad(inner) => inner.status(),
            PlatformError::Database(_) | PlatformError::Configuration { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Error response body
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PlatformError::validation("x").status().0, StatusCode::BAD_REQUEST);
        assert_eq!(PlatformError::unauthorized("x").status().0, StatusCode::UNAUTHORIZED);
        assert_eq!(PlatformError::forbidden("x").status().0, StatusCode::FORBIDDEN);
        assert_eq!(PlatformError::not_found("users", "1").status().0, StatusCode::NOT_FOUND);
        assert_eq!(
            PlatformError::configuration("x").status().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_batch_error_keeps_inner_status() {
        let inner = Arc::new(PlatformError::Database(sqlx::Error::PoolTimedOut));
        let err = PlatformError::BatchLoad(inner);
        assert_eq!(err.status(), (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"));
        assert!(err.to_string().starts_with("Batch load failed: Database error"));
    }
}
