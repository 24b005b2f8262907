//! webcache - an expiring, optionally obfuscated cache over key/value storage
//!
//! Wraps any [`storage::Storage`] backend with per-entry expiry, transparent
//! JSON serialization, reversible key/value obfuscation and quota recovery.
//! A small HTTP server exposing one file-backed cache ships as the `webcache` binary.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheOptions, Expiry, SetOptions, WebCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, StorageKind};
pub use tasks::spawn_sweep_task;
