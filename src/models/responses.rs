//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for conditional writes (POST /add, /replace, /touch)
#[derive(Debug, Clone, Serialize)]
pub struct WriteResponse {
    pub key: String,
    /// Whether the condition held and the entry was written
    pub written: bool,
}

impl WriteResponse {
    pub fn new(key: impl Into<String>, written: bool) -> Self {
        Self {
            key: key.into(),
            written,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for the sweep endpoint (POST /sweep)
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    /// Keys of the expired entries removed
    pub deleted: Vec<String>,
    pub count: usize,
}

impl SweepResponse {
    pub fn new(deleted: Vec<String>) -> Self {
        Self {
            count: deleted.len(),
            deleted,
        }
    }
}

/// Response body for the raw read endpoint (GET /raw/:key)
#[derive(Debug, Clone, Serialize)]
pub struct RawResponse {
    pub key: String,
    /// Envelope exactly as stored
    pub raw: String,
    /// Milliseconds until the entry expires, None when the slot is not a live entry
    pub ttl_ms: Option<u64>,
}

impl RawResponse {
    pub fn new(key: impl Into<String>, raw: String, ttl_ms: Option<u64>) -> Self {
        Self {
            key: key.into(),
            raw,
            ttl_ms,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries written
    pub writes: u64,
    /// Number of expired entries removed
    pub expired: u64,
    /// Number of purge-and-retry recoveries after a full store
    pub quota_recoveries: u64,
    /// Current number of slots in the store
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, total_entries: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            writes: stats.writes,
            expired: stats.expired,
            quota_recoveries: stats.quota_recoveries,
            total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" when the store is unusable
    pub status: String,
    /// Whether the backing store passed its probe
    pub supported: bool,
    /// Whether stored data is obfuscated
    pub obfuscated: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(supported: bool, obfuscated: bool) -> Self {
        Self {
            status: if supported { "healthy" } else { "degraded" }.to_string(),
            supported,
            obfuscated,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
