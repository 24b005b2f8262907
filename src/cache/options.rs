//! Cache options
//!
//! Per-call write options and per-instance constructor options.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

use crate::cache::crypt::{default_decoder, default_encoder, DecodeFn, EncodeFn};
use crate::cache::Expiry;
use crate::storage::StorageKind;

// == Set Options ==
/// Options for a single `set`/`add`/`replace`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOptions {
    /// Expiry for this write, None = the cache's default expiry
    pub exp: Option<Expiry>,
    /// Purge expired entries and retry once when the store is full
    pub force: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            exp: None,
            force: true,
        }
    }
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exp(mut self, exp: impl Into<Expiry>) -> Self {
        self.exp = Some(exp.into());
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

// A bare expiry is shorthand for options carrying only that expiry.
impl From<Expiry> for SetOptions {
    fn from(exp: Expiry) -> Self {
        Self::new().exp(exp)
    }
}

macro_rules! options_from_expiry {
    ($($t:ty),*) => {
        $(
            impl From<$t> for SetOptions {
                fn from(exp: $t) -> Self {
                    Self::new().exp(exp)
                }
            }
        )*
    };
}

options_from_expiry!(i32, i64, u32, u64, f64, StdDuration, DateTime<Utc>, &str, String);

// == Cache Options ==
/// Constructor options, fixed for the lifetime of a cache.
#[derive(Clone)]
pub struct CacheOptions {
    /// Backend selected by [`crate::WebCache::open`]
    pub storage: StorageKind,
    /// Byte quota applied to backends opened by name
    pub quota_bytes: Option<usize>,
    /// Expiry used when a write does not give one
    pub exp: Expiry,
    /// Obfuscate keys and envelopes
    pub crypt: bool,
    pub encrypt: Option<EncodeFn>,
    pub decrypt: Option<DecodeFn>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            storage: StorageKind::default(),
            quota_bytes: None,
            exp: Expiry::Never,
            crypt: true,
            encrypt: Some(default_encoder()),
            decrypt: Some(default_decoder()),
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session() -> Self {
        Self::default().storage(StorageKind::Session)
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::default().storage(StorageKind::Local { path: path.into() })
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn quota_bytes(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn exp(mut self, exp: impl Into<Expiry>) -> Self {
        self.exp = exp.into();
        self
    }

    pub fn crypt(mut self, crypt: bool) -> Self {
        self.crypt = crypt;
        self
    }

    /// Replaces the transform pair. Either half may be None, which disables obfuscation.
    pub fn transform(mut self, encrypt: Option<EncodeFn>, decrypt: Option<DecodeFn>) -> Self {
        self.encrypt = encrypt;
        self.decrypt = decrypt;
        self
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("storage", &self.storage)
            .field("quota_bytes", &self.quota_bytes)
            .field("exp", &self.exp)
            .field("crypt", &self.crypt)
            .field("encrypt", &self.encrypt.is_some())
            .field("decrypt", &self.decrypt.is_some())
            .finish()
    }
}
