//! Error types for the cache server
//!
//! Provides unified error handling using thiserror. `CacheError` covers
//! everything that can happen while serving a request; `ConfigError` covers
//! startup failures that stop the process before any route is registered.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified request-time error type for the cache server.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in the backend
    #[error("Key not found: {0}")]
    NotFound(String),

    /// A record already exists under the requested key
    #[error("Key already exists: {0}")]
    KeyExists(String),

    /// Uncompressed payload is larger than the configured ceiling
    #[error("Payload size {size} exceeds the maximum of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Requested TTL is larger than the resolved ceiling
    #[error("TTL of {requested} seconds exceeds the maximum of {limit} seconds")]
    TtlExceeded { requested: u64, limit: u64 },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Stored payload does not carry a known type tag
    #[error("Cache data was corrupted: {0}")]
    Corrupted(String),

    /// Storage engine could not be reached or refused the operation
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Storage engine did not answer in time
    #[error("Backend timed out: {0}")]
    Timeout(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true for rejections raised by request validation rather than storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CacheError::PayloadTooLarge { .. }
                | CacheError::TtlExceeded { .. }
                | CacheError::InvalidRequest(_)
        )
    }

    /// HTTP status used when this error reaches a client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::KeyExists(_) => StatusCode::CONFLICT,
            CacheError::PayloadTooLarge { .. }
            | CacheError::TtlExceeded { .. }
            | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Corrupted(_) | CacheError::Internal(_) => {
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

// == Storage Client Conversions ==
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CacheError::Timeout(err.to_string())
        } else {
            CacheError::Unavailable(err.to_string())
        }
    }
}

impl From<scylla::transport::errors::QueryError> for CacheError {
    fn from(err: scylla::transport::errors::QueryError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            CacheError::Timeout(err.to_string())
        } else {
            CacheError::Unavailable(err.to_string())
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Config Error Enum ==
/// Fatal startup errors. None of these can occur once traffic is being served.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown backend type: {0}")]
    UnknownBackend(String),

    #[error("Backend type {0} is not available in this build")]
    UnsupportedBackend(String),

    #[error(r#"Invalid compression type: {0}. It must be "none" or "snappy""#)]
    UnknownCompression(String),

    #[error("Invalid {name}: {value}. Value cannot be negative")]
    NegativeLimit { name: String, value: i64 },

    #[error("Invalid {name}: {value:?} is not a valid value")]
    Malformed { name: String, value: String },

    #[error("Missing required setting {0}")]
    Missing(String),

    #[error("Backend construction failed: {0}")]
    BackendInit(String),

    #[error("Backend construction timed out after {0}ms")]
    BackendTimeout(u64),
}
