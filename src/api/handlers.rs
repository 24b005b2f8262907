//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::cache::WebCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, RawResponse, SetRequest, SetResponse,
    StatsResponse, SweepResponse, TouchRequest, WriteResponse,
};
use crate::storage::DynStorage;

/// Cache type served over HTTP.
pub type ServerCache = WebCache<DynStorage>;

/// Application state shared across all handlers.
///
/// Contains the cache wrapped in Arc<RwLock<>> for thread-safe access.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache
    pub cache: Arc<RwLock<ServerCache>>,
}

impl AppState {
    /// Creates a new AppState with the given cache.
    pub fn new(cache: ServerCache) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the configured backend and builds the cache over it.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = WebCache::open(config.cache_options())?;
        Ok(Self::new(cache))
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value under a key with optional expiry.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let options = req.options().map_err(CacheError::InvalidRequest)?;

    let mut cache = state.cache.write().await;
    cache.set(&req.key, req.value, options)?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a live value from the cache by key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    // Write lock: reading an expired entry deletes it
    let mut cache = state.cache.write().await;
    match cache.get::<_, Value>(&key) {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let mut cache = state.cache.write().await;
    Json(DeleteResponse::new(cache.delete(key)))
}

/// Handler for POST /add
///
/// Writes only when no live entry exists for the key.
pub async fn add_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<WriteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let options = req.options().map_err(CacheError::InvalidRequest)?;

    let mut cache = state.cache.write().await;
    let written = cache.add(&req.key, req.value, options)?;

    Ok(Json(WriteResponse::new(req.key, written)))
}

/// Handler for POST /replace
///
/// Writes only when a live entry exists for the key.
pub async fn replace_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<WriteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let options = req.options().map_err(CacheError::InvalidRequest)?;

    let mut cache = state.cache.write().await;
    let written = cache.replace(&req.key, req.value, options)?;

    Ok(Json(WriteResponse::new(req.key, written)))
}

/// Handler for POST /touch
///
/// Gives a live entry a new expiry.
pub async fn touch_handler(
    State(state): State<AppState>,
    Json(req): Json<TouchRequest>,
) -> Result<Json<WriteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let exp = req.expiry().map_err(CacheError::InvalidRequest)?;

    let mut cache = state.cache.write().await;
    let written = cache.touch(&req.key, exp)?;

    Ok(Json(WriteResponse::new(req.key, written)))
}

/// Handler for POST /sweep
///
/// Deletes every expired entry in the store.
pub async fn sweep_handler(State(state): State<AppState>) -> Json<SweepResponse> {
    let mut cache = state.cache.write().await;
    Json(SweepResponse::new(cache.delete_all_expires()))
}

/// Handler for DELETE /clear
///
/// Empties the whole backing store.
pub async fn clear_handler(State(state): State<AppState>) -> StatusCode {
    let mut cache = state.cache.write().await;
    cache.clear();
    StatusCode::NO_CONTENT
}

/// Handler for GET /raw/:key
///
/// Returns the envelope as stored, still obfuscated, with its remaining lifetime.
pub async fn raw_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RawResponse>> {
    let mut cache = state.cache.write().await;
    // Checked first: an expired entry is deleted and the lookup below misses
    let ttl_ms = cache.ttl_remaining_ms(&key);
    match cache.get_encrypted_raw(&key) {
        Some(raw) => Ok(Json(RawResponse::new(key, raw, ttl_ms))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;
    Json(StatsResponse::new(&cache.stats(), cache.len()))
}

/// Handler for GET /health
///
/// Reports 503 when the backing store failed its probe.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let cache = state.cache.read().await;
    let health = HealthResponse::new(cache.is_supported(), cache.is_obfuscated());
    let status = if health.supported {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}
