//! Cache Statistics Module
//!
//! Tracks cache activity: hits, misses, writes, expirations and quota recoveries.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache activity counters.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that returned a value
    pub hits: u64,
    /// Reads that found nothing usable (absent, malformed or expired)
    pub misses: u64,
    /// Entries written to the backing store
    pub writes: u64,
    /// Expired entries removed, lazily on read or by a sweep
    pub expired: u64,
    /// Writes that hit the store quota and triggered a purge-and-retry
    pub quota_recoveries: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired += count as u64;
    }

    pub fn record_quota_recovery(&mut self) {
        self.quota_recoveries += 1;
    }
}
