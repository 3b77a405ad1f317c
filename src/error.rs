//! Error types for the StreamTube service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache store, search service and HTTP layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache (absent or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Persisted record could not be read or parsed.
    ///
    /// Never returned from `FileStore::get`; used to classify read failures
    /// for logging and statistics.
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// Storage write could not complete
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Argument rejected before any storage I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Search provider failed or returned garbage
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::Upstream(_) => StatusCode::BAD_GATEWAY,
            CacheError::Corrupt(_) | CacheError::WriteFailure(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Upstream(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the StreamTube crate.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (CacheError::Corrupt("k".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CacheError::WriteFailure("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CacheError::InvalidArgument("bad".into()), StatusCode::BAD_REQUEST),
            (CacheError::Upstream("down".into()), StatusCode::BAD_GATEWAY),
            (CacheError::Internal("oops".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_error_display_includes_message() {
        let err = CacheError::InvalidArgument("Key cannot be empty".into());
        assert_eq!(err.to_string(), "Invalid argument: Key cannot be empty");
    }
}
