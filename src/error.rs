//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror. Inside the crate these
//! errors travel with `?`; the cache manager is the boundary where they are
//! logged, counted and collapsed into safe defaults.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer and its HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Value could not be serialized, or a stored payload could not be parsed
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Compressed payload could not be packed or unpacked
    #[error("Compression error: {0}")]
    Compression(String),

    /// Distributed store command or connection failure
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Distributed store call exceeded the configured command timeout
    #[error("Distributed store operation timed out")]
    Timeout,

    /// Distributed store is disconnected and not accepting commands
    #[error("Distributed store unavailable: {0}")]
    Unavailable(String),

    /// TTL outside the accepted range
    #[error("Invalid ttl: {0}")]
    InvalidTtl(u64),

    /// Counter increment left the i64 range
    #[error("Counter overflow at '{0}'")]
    Overflow(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true for failures that mean the distributed store is unreachable,
    /// as opposed to a bad payload or a caller mistake.
    pub fn is_connectivity(&self) -> bool {
        match self {
            CacheError::Redis(e) => {
                e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
            }
            CacheError::Timeout | CacheError::Unavailable(_) => true,
            _ => false,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Compression(err.to_string())
    }
}

impl From<base64::DecodeError> for CacheError {
    fn from(err: base64::DecodeError) -> Self {
        CacheError::Compression(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::InvalidTtl(_) | CacheError::Overflow(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Unavailable(_) | CacheError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Codec(_)
            | CacheError::Compression(_)
            | CacheError::Redis(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match self {
            CacheError::InvalidRequest(msg) => msg,
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
