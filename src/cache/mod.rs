//! Cache Module
//!
//! Expiring, optionally obfuscated cache layered over a [`crate::storage::Storage`].

mod clock;
mod crypt;
mod entry;
mod expiry;
mod key;
mod options;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use crypt::{
    base64_decode, base64_encode, default_decoder, default_encoder, DecodeFn, EncodeFn,
    ObfuscationGate, TransformError,
};
pub use entry::{CacheEntry, Envelope};
pub use expiry::{max_expiry, parse_date, Expiry, MAX_EXPIRY_MS};
pub use key::IntoCacheKey;
pub use options::{CacheOptions, SetOptions};
pub use stats::CacheStats;
pub use store::WebCache;
