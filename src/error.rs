//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::storage::StorageError;

// == Cache Error Enum ==
/// Unified error type for the cache and its HTTP front end.
#[derive(Error, Debug)]
pub enum CacheError {
    /// An expiry specifier could not be converted to an instant
    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    /// A value could not be serialized into an entry payload
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store could not be opened
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidExpiry(_)
            | CacheError::Serialization(_)
            | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
