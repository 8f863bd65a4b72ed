/// Unified error types for memberd
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for lookups and the HTTP layer around them
///
/// `NotFound` is the only kind produced by a successful round-trip to the
/// directory. Everything else is an infrastructure failure the caller should
/// treat as retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LookupError {
    /// The lookup resolved to zero members
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed binary security identifier
    #[error("Decode error: {0}")]
    Decode(String),

    /// Directory connection or protocol errors
    #[error("Directory error: {0}")]
    Directory(String),

    /// Cache store errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// The operation context deadline elapsed
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The operation context was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Malformed caller input or configuration
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or wrong shared secret
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound(_))
    }

    /// Stable machine-readable code, also used as a metrics label
    pub fn code(&self) -> &'static str {
        match self {
            LookupError::NotFound(_) => "NotFound",
            LookupError::Decode(_) => "DecodeError",
            LookupError::Directory(_) => "DirectoryError",
            LookupError::Cache(_) => "CacheError",
            LookupError::Timeout(_) => "Timeout",
            LookupError::Cancelled => "Cancelled",
            LookupError::Validation(_) => "InvalidRequest",
            LookupError::Authentication(_) => "AuthenticationRequired",
            LookupError::Internal(_) => "InternalServerError",
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert LookupError to HTTP response
impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            LookupError::NotFound(_) => (StatusCode::NOT_FOUND, self.code(), self.to_string()),
            LookupError::Validation(_) => {
                (StatusCode::BAD_REQUEST, self.code(), self.to_string())
            }
            LookupError::Authentication(_) => {
                (StatusCode::UNAUTHORIZED, self.code(), self.to_string())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for lookup operations
pub type LookupResult<T> = Result<T, LookupError>;
