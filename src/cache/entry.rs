//! Cache Entry Module
//!
//! Defines the envelope persisted for every cached value: the serialized
//! payload plus creation and expiration timestamps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A stored envelope, persisted as `{"c": <ms>, "e": <ms>, "v": "<payload>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Creation timestamp (Unix milliseconds)
    #[serde(rename = "c")]
    pub created_at: i64,
    /// Expiration timestamp (Unix milliseconds), never absent
    #[serde(rename = "e")]
    pub expires_at: i64,
    /// The caller's value, already serialized
    #[serde(rename = "v")]
    pub payload: String,
}

/// Result of parsing raw stored text as an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Valid(CacheEntry),
    /// Not an object carrying integer `c` and `e` and a string `v`
    Malformed,
}

impl CacheEntry {
    // == Constructor ==
    /// Wraps a serialized value, stamping it as created at `now_ms`.
    pub fn wrap(payload: String, expires_at: i64, now_ms: i64) -> Self {
        Self {
            created_at: now_ms,
            expires_at,
            payload,
        }
    }

    // == Parse ==
    /// Parses and validates raw stored text.
    ///
    /// Anything else found in the store, such as values written by other
    /// code sharing it, comes back as [`Envelope::Malformed`].
    pub fn parse(raw: &str) -> Envelope {
        let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(raw) else {
            return Envelope::Malformed;
        };

        let created_at = fields.get("c").and_then(timestamp_ms);
        let expires_at = fields.get("e").and_then(timestamp_ms);
        let payload = fields.get("v").and_then(Value::as_str);

        match (created_at, expires_at, payload) {
            (Some(created_at), Some(expires_at), Some(payload)) => Envelope::Valid(Self {
                created_at,
                expires_at,
                payload: payload.to_string(),
            }),
            _ => Envelope::Malformed,
        }
    }

    /// Serializes the envelope to its stored JSON form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    // == Is Live ==
    /// Checks if the entry is still live at `now_ms`.
    ///
    /// Strict: an entry whose expiry equals `now_ms` is already dead.
    pub fn is_live(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: i64) -> u64 {
        (self.expires_at - now_ms).max(0) as u64
    }
}

/// Reads an integral millisecond timestamp, accepting floats without a fractional part.
fn timestamp_ms(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|ms| ms.is_finite() && ms.fract() == 0.0)
            .map(|ms| ms as i64)
    })
}
