//! Configuration Module
//!
//! Handles loading server and cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::{CacheOptions, Expiry};
use crate::storage::{StorageKind, DEFAULT_LOCAL_PATH};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend selector, "local" or "session"
    pub storage: String,
    /// File used by the local backend
    pub storage_path: PathBuf,
    /// Default expiry in seconds for entries without one, None = never expires
    pub default_exp: Option<u64>,
    /// Obfuscate keys and values in the store
    pub crypt: bool,
    /// Byte quota for the backend, None = unlimited
    pub quota_bytes: Option<usize>,
    /// HTTP server port
    pub server_port: u16,
    /// Seconds between expired-entry sweeps, 0 disables sweeping
    pub sweep_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `WEBCACHE_STORAGE` - `local` or `session` (default: local)
    /// - `WEBCACHE_PATH` - Local store file (default: webcache.json)
    /// - `DEFAULT_EXP` - Default expiry in seconds (default: never)
    /// - `WEBCACHE_CRYPT` - Obfuscate stored data (default: true)
    /// - `QUOTA_BYTES` - Store quota in bytes (default: unlimited)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            storage: env::var("WEBCACHE_STORAGE").unwrap_or(defaults.storage),
            storage_path: env::var("WEBCACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            default_exp: env::var("DEFAULT_EXP").ok().and_then(|v| v.parse().ok()),
            crypt: env::var("WEBCACHE_CRYPT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.crypt),
            quota_bytes: env::var("QUOTA_BYTES").ok().and_then(|v| v.parse().ok()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            sweep_interval: env::var("SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
        }
    }

    /// Resolves the configured backend, falling back to local for unknown names.
    pub fn storage_kind(&self) -> StorageKind {
        StorageKind::from_name(&self.storage, &self.storage_path).unwrap_or_else(|| {
            tracing::warn!("Unknown storage '{}', using local", self.storage);
            StorageKind::Local {
                path: self.storage_path.clone(),
            }
        })
    }

    /// Builds the cache constructor options.
    pub fn cache_options(&self) -> CacheOptions {
        let mut options = CacheOptions::new()
            .storage(self.storage_kind())
            .crypt(self.crypt)
            .exp(self.default_exp.map_or(Expiry::Never, Expiry::from));
        options.quota_bytes = self.quota_bytes;
        options
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: "local".to_string(),
            storage_path: PathBuf::from(DEFAULT_LOCAL_PATH),
            default_exp: None,
            crypt: true,
            quota_bytes: None,
            server_port: 3000,
            sweep_interval: 60,
        }
    }
}
