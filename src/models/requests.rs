//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{Expiry, SetOptions};

/// Request body for SET, ADD and REPLACE (PUT /set, POST /add, POST /replace)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// Any JSON value to store
    pub value: Value,
    /// Expiry as seconds or a date string; absent uses the cache default
    #[serde(default)]
    pub exp: Option<Value>,
    /// Purge expired entries and retry when the store is full
    #[serde(default)]
    pub force: Option<bool>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }

    /// Builds the write options, or an error message for an unusable `exp`.
    pub fn options(&self) -> Result<SetOptions, String> {
        let mut options = SetOptions::new().force(self.force.unwrap_or(true));
        options.exp = self.exp.as_ref().map(expiry_from_json).transpose()?;
        Ok(options)
    }
}

/// Request body for TOUCH (POST /touch)
#[derive(Debug, Clone, Deserialize)]
pub struct TouchRequest {
    pub key: String,
    /// New expiry as seconds or a date string
    pub exp: Value,
}

impl TouchRequest {
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }

    pub fn expiry(&self) -> Result<Expiry, String> {
        expiry_from_json(&self.exp)
    }
}

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    None
}

/// Maps a JSON number to seconds and a JSON string to a date.
fn expiry_from_json(value: &Value) -> Result<Expiry, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(Expiry::Seconds)
            .ok_or_else(|| format!("Expiry {} is not a usable number", n)),
        Value::String(text) => Ok(Expiry::Text(text.clone())),
        other => Err(format!("Expiry must be seconds or a date string, got {}", other)),
    }
}
