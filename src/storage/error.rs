//! Storage error types
//!
//! Backends report write failures with a numeric code and a name, the same
//! attributes the cache inspects to recognise a full store.

use thiserror::Error;

/// Code reported when a store has run out of room.
pub const QUOTA_EXCEEDED_CODE: u16 = 22;

/// Code some backends use for a quota failure, qualified by [`QUOTA_REACHED_NAME`].
pub const QUOTA_REACHED_CODE: u16 = 1014;

pub const QUOTA_EXCEEDED_NAME: &str = "QuotaExceededError";
pub const QUOTA_REACHED_NAME: &str = "NS_ERROR_DOM_QUOTA_REACHED";

/// Code reported when the store refuses all access.
pub const SECURITY_ERROR_CODE: u16 = 18;

// == Storage Error Enum ==
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend refused the operation
    #[error("{name} (code {code}): {message}")]
    Rejected {
        code: u16,
        name: String,
        message: String,
    },

    /// Reading or writing the backing file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file does not hold a JSON string map
    #[error("Corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl StorageError {
    /// A write rejected because the store is full.
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        StorageError::Rejected {
            code: QUOTA_EXCEEDED_CODE,
            name: QUOTA_EXCEEDED_NAME.to_string(),
            message: message.into(),
        }
    }

    /// An operation rejected because the store is disabled.
    pub fn security(message: impl Into<String>) -> Self {
        StorageError::Rejected {
            code: SECURITY_ERROR_CODE,
            name: "SecurityError".to_string(),
            message: message.into(),
        }
    }

    // == Quota Classification ==
    /// Returns true when the error attributes describe a capacity failure.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            StorageError::Rejected { code, name, .. } => match *code {
                QUOTA_EXCEEDED_CODE => true,
                QUOTA_REACHED_CODE => name == QUOTA_REACHED_NAME,
                _ => name == QUOTA_EXCEEDED_NAME,
            },
            StorageError::Io(_) | StorageError::Corrupt(_) => false,
        }
    }
}
