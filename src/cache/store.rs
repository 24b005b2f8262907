//! Cache Store Module
//!
//! The cache facade: serializes values into expiring envelopes, obfuscates
//! them, writes them to the backing store and recovers from full stores.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::crypt::TransformError;
use crate::cache::{
    CacheEntry, CacheOptions, CacheStats, Clock, Envelope, Expiry, IntoCacheKey, ObfuscationGate,
    SetOptions, SystemClock,
};
use crate::error::Result;
use crate::storage::{DynStorage, Storage, StorageError};

// == Web Cache ==
/// Expiring cache over a [`Storage`] backend.
///
/// Built in one of two modes, fixed at construction: active, or a no-op
/// stand-in when the backend failed its write probe.
#[derive(Debug)]
pub struct WebCache<S> {
    mode: Mode<S>,
}

#[derive(Debug)]
enum Mode<S> {
    Active(Engine<S>),
    Unsupported,
}

#[derive(Debug)]
struct Engine<S> {
    storage: S,
    gate: ObfuscationGate,
    /// Expiry applied to writes that do not give one
    default_exp: Expiry,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

/// What a read found under a key.
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    Found(CacheEntry),
    Absent,
    Malformed,
    Undecodable(TransformError),
}

impl<S: Storage> WebCache<S> {
    // == Constructor ==
    /// Creates a cache over `storage` using the system clock.
    ///
    /// Fails only when the default expiry cannot be resolved.
    pub fn new(storage: S, options: CacheOptions) -> Result<Self> {
        Self::with_clock(storage, options, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(
        mut storage: S,
        options: CacheOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        options.exp.resolve_ms(clock.now())?;

        if !is_storage_supported(&mut storage) {
            return Ok(Self {
                mode: Mode::Unsupported,
            });
        }

        let gate = ObfuscationGate::new(options.crypt, options.encrypt, options.decrypt);
        debug!(
            "Cache ready: obfuscation={}, default expiry={:?}",
            gate.is_enabled(),
            options.exp
        );

        Ok(Self {
            mode: Mode::Active(Engine {
                storage,
                gate,
                default_exp: options.exp,
                clock,
                stats: CacheStats::new(),
            }),
        })
    }

    /// Whether the backend passed its probe at construction.
    pub fn is_supported(&self) -> bool {
        matches!(self.mode, Mode::Active(_))
    }

    /// Whether keys and envelopes are obfuscated before being stored.
    pub fn is_obfuscated(&self) -> bool {
        match &self.mode {
            Mode::Active(engine) => engine.gate.is_enabled(),
            Mode::Unsupported => false,
        }
    }

    pub fn storage(&self) -> Option<&S> {
        match &self.mode {
            Mode::Active(engine) => Some(&engine.storage),
            Mode::Unsupported => None,
        }
    }

    pub fn storage_mut(&mut self) -> Option<&mut S> {
        match &mut self.mode {
            Mode::Active(engine) => Some(&mut engine.storage),
            Mode::Unsupported => None,
        }
    }

    /// Returns a snapshot of the activity counters.
    pub fn stats(&self) -> CacheStats {
        match &self.mode {
            Mode::Active(engine) => engine.stats.clone(),
            Mode::Unsupported => CacheStats::default(),
        }
    }

    /// Number of slots in the backing store, foreign ones included.
    pub fn len(&self) -> usize {
        self.storage().map_or(0, |storage| storage.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Set ==
    /// Stores `value` under `key` and returns the value.
    ///
    /// Only an unresolvable expiry or an unserializable value is reported;
    /// failed writes to the backend are logged.
    pub fn set<K, V>(&mut self, key: K, value: V, options: impl Into<SetOptions>) -> Result<V>
    where
        K: IntoCacheKey,
        V: Serialize,
    {
        let key = key.into_cache_key();
        let Mode::Active(engine) = &mut self.mode else {
            return Ok(value);
        };

        let payload = serde_json::to_string(&value)?;
        engine.write(&key, payload, &options.into())?;
        Ok(value)
    }

    /// Stores `Some(value)`, or deletes the key when given None.
    pub fn set_or_remove<K, V>(
        &mut self,
        key: K,
        value: Option<V>,
        options: impl Into<SetOptions>,
    ) -> Result<Option<V>>
    where
        K: IntoCacheKey,
        V: Serialize,
    {
        match value {
            Some(value) => self.set(key, value, options).map(Some),
            None => {
                self.delete(key);
                Ok(None)
            }
        }
    }

    // == Get ==
    /// Returns the live value stored under `key`.
    ///
    /// Never fails: missing, foreign, undecodable and mistyped entries all
    /// read as None. An expired entry is deleted on the way.
    pub fn get<K, V>(&mut self, key: K) -> Option<V>
    where
        K: IntoCacheKey,
        V: DeserializeOwned,
    {
        let key = key.into_cache_key();
        let Mode::Active(engine) = &mut self.mode else {
            return None;
        };
        engine.get(&key)
    }

    // == Delete ==
    /// Removes `key` from the store and returns the normalized key.
    pub fn delete<K: IntoCacheKey>(&mut self, key: K) -> String {
        let key = key.into_cache_key();
        if let Mode::Active(engine) = &mut self.mode {
            engine.remove(&key);
        }
        key
    }

    // == Add ==
    /// Stores `value` only if no live entry exists for `key`.
    ///
    /// Returns whether a write happened.
    pub fn add<K, V>(&mut self, key: K, value: V, options: impl Into<SetOptions>) -> Result<bool>
    where
        K: IntoCacheKey,
        V: Serialize,
    {
        let key = key.into_cache_key();
        let Mode::Active(engine) = &mut self.mode else {
            return Ok(false);
        };

        let now_ms = engine.clock.now_ms();
        if let ReadOutcome::Found(entry) = engine.read(&key) {
            if entry.is_live(now_ms) {
                return Ok(false);
            }
        }

        let payload = serde_json::to_string(&value)?;
        engine.write(&key, payload, &options.into())?;
        Ok(true)
    }

    // == Replace ==
    /// Stores `value` only if a live entry exists for `key`.
    ///
    /// An expired entry is deleted and counts as missing. Returns whether a
    /// write happened.
    pub fn replace<K, V>(
        &mut self,
        key: K,
        value: V,
        options: impl Into<SetOptions>,
    ) -> Result<bool>
    where
        K: IntoCacheKey,
        V: Serialize,
    {
        let key = key.into_cache_key();
        let Mode::Active(engine) = &mut self.mode else {
            return Ok(false);
        };

        if engine.take_live(&key).is_none() {
            return Ok(false);
        }

        let payload = serde_json::to_string(&value)?;
        engine.write(&key, payload, &options.into())?;
        Ok(true)
    }

    // == Touch ==
    /// Rewrites the live entry under `key` with a new expiry, keeping its value.
    ///
    /// An expired entry is deleted. Returns whether the entry was refreshed.
    pub fn touch<K: IntoCacheKey>(&mut self, key: K, exp: impl Into<Expiry>) -> Result<bool> {
        let key = key.into_cache_key();
        let Mode::Active(engine) = &mut self.mode else {
            return Ok(false);
        };

        let Some(entry) = engine.take_live(&key) else {
            return Ok(false);
        };

        engine.write(&key, entry.payload, &SetOptions::new().exp(exp))?;
        Ok(true)
    }

    // == Delete All Expires ==
    /// Deletes every expired entry in the store and returns their keys.
    pub fn delete_all_expires(&mut self) -> Vec<String> {
        match &mut self.mode {
            Mode::Active(engine) => engine.delete_all_expires(),
            Mode::Unsupported => Vec::new(),
        }
    }

    // == Clear ==
    /// Empties the whole backing store, including entries not written by this cache.
    pub fn clear(&mut self) {
        if let Mode::Active(engine) = &mut self.mode {
            if let Err(e) = engine.storage.clear() {
                error!("Failed to clear storage: {}", e);
            }
        }
    }

    // == Storage-Compatible Aliases ==
    /// Reads `key` as text. String values come back as-is, other JSON values as JSON.
    pub fn get_item<K: IntoCacheKey>(&mut self, key: K) -> Option<String> {
        match self.get::<K, Value>(key)? {
            Value::Null => None,
            Value::String(text) => Some(text),
            other => Some(other.to_string()),
        }
    }

    /// Stores text under `key` with default options. Errors are logged, not returned.
    pub fn set_item<K: IntoCacheKey>(&mut self, key: K, value: &str) {
        if let Err(e) = self.set(key, value, SetOptions::default()) {
            error!("set_item failed: {}", e);
        }
    }

    pub fn remove_item<K: IntoCacheKey>(&mut self, key: K) {
        self.delete(key);
    }

    /// Returns the envelope for `key` exactly as stored, still obfuscated.
    ///
    /// Without obfuscation this behaves like [`WebCache::get_item`].
    pub fn get_encrypted_raw<K: IntoCacheKey>(&mut self, key: K) -> Option<String> {
        let key = key.into_cache_key();
        let Mode::Active(engine) = &self.mode else {
            return None;
        };

        if !engine.gate.is_enabled() {
            return self.get_item(key);
        }
        engine.storage.get_item(&engine.gate.encode(&key))
    }

    /// Remaining lifetime of the live entry under `key`, in milliseconds.
    ///
    /// An expired entry is deleted and reads as None.
    pub fn ttl_remaining_ms<K: IntoCacheKey>(&mut self, key: K) -> Option<u64> {
        let key = key.into_cache_key();
        let Mode::Active(engine) = &mut self.mode else {
            return None;
        };
        let entry = engine.take_live(&key)?;
        Some(entry.ttl_remaining_ms(engine.clock.now_ms()))
    }

    // == Obfuscation ==
    /// Applies the configured encode transform, or returns `value` unchanged.
    pub fn encrypt(&self, value: &str) -> String {
        match &self.mode {
            Mode::Active(engine) => engine.gate.encode(value),
            Mode::Unsupported => value.to_string(),
        }
    }

    /// Applies the configured decode transform, or returns `value` unchanged.
    pub fn decrypt(&self, value: &str) -> std::result::Result<String, TransformError> {
        match &self.mode {
            Mode::Active(engine) => engine.gate.decode(value),
            Mode::Unsupported => Ok(value.to_string()),
        }
    }

    #[cfg(test)]
    pub(crate) fn read(&self, key: &str) -> Option<ReadOutcome> {
        match &self.mode {
            Mode::Active(engine) => Some(engine.read(key)),
            Mode::Unsupported => None,
        }
    }
}

impl WebCache<DynStorage> {
    /// Opens the backend selected by `options.storage` and builds a cache over it.
    ///
    /// A backend that cannot be opened leaves the cache unsupported rather
    /// than failing; only an unresolvable default expiry is an error.
    pub fn open(options: CacheOptions) -> Result<Self> {
        match options.storage.open(options.quota_bytes) {
            Ok(storage) => {
                info!("Opened {:?} storage", options.storage);
                Self::new(storage, options)
            }
            Err(e) => {
                options.exp.resolve_ms(Utc::now())?;
                warn!(
                    "Failed to open {:?} storage, cache operations are disabled: {}",
                    options.storage, e
                );
                Ok(Self {
                    mode: Mode::Unsupported,
                })
            }
        }
    }
}

impl<S: Storage> Engine<S> {
    // == Read Path ==
    fn read(&self, key: &str) -> ReadOutcome {
        let Some(raw) = self.storage.get_item(&self.gate.encode(key)) else {
            return ReadOutcome::Absent;
        };
        match self.gate.decode(&raw) {
            Ok(text) => match CacheEntry::parse(&text) {
                Envelope::Valid(entry) => ReadOutcome::Found(entry),
                Envelope::Malformed => ReadOutcome::Malformed,
            },
            Err(e) => ReadOutcome::Undecodable(e),
        }
    }

    /// Returns the live entry under `key`, deleting it first if it has expired.
    fn take_live(&mut self, key: &str) -> Option<CacheEntry> {
        match self.read(key) {
            ReadOutcome::Found(entry) if entry.is_live(self.clock.now_ms()) => Some(entry),
            ReadOutcome::Found(_) => {
                self.remove(key);
                self.stats.record_expired(1);
                None
            }
            ReadOutcome::Absent | ReadOutcome::Malformed => None,
            ReadOutcome::Undecodable(e) => {
                debug!("Entry '{}' could not be decoded: {}", key, e);
                None
            }
        }
    }

    fn get<V: DeserializeOwned>(&mut self, key: &str) -> Option<V> {
        let value = self.take_live(key).and_then(|entry| {
            serde_json::from_str(&entry.payload)
                .map_err(|e| debug!("Entry '{}' does not hold the requested type: {}", key, e))
                .ok()
        });

        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    fn remove(&mut self, key: &str) {
        if let Err(e) = self.storage.remove_item(&self.gate.encode(key)) {
            error!("Failed to remove '{}': {}", key, e);
        }
    }

    // == Write Path ==
    /// Wraps `payload` in an envelope and stores it.
    fn write(&mut self, key: &str, payload: String, options: &SetOptions) -> Result<()> {
        let now = self.clock.now();
        let exp = options.exp.as_ref().unwrap_or(&self.default_exp);
        let expires_at = exp.resolve_ms(now)?;

        let entry = CacheEntry::wrap(payload, expires_at, now.timestamp_millis());
        let stored_key = self.gate.encode(key);
        let stored_value = self.gate.encode(&entry.to_json()?);

        self.store(key, &stored_key, &stored_value, options.force);
        Ok(())
    }

    fn store(&mut self, key: &str, stored_key: &str, stored_value: &str, force: bool) {
        match self.storage.set_item(stored_key, stored_value) {
            Ok(()) => self.stats.record_write(),
            Err(e) if e.is_quota_exceeded() => {
                self.recover_quota(key, stored_key, stored_value, force, e)
            }
            Err(e) => error!("Failed to write '{}': {}", key, e),
        }
    }

    // == Capacity Recovery ==
    /// Purges expired entries and retries the write once, with force off.
    fn recover_quota(
        &mut self,
        key: &str,
        stored_key: &str,
        stored_value: &str,
        force: bool,
        err: StorageError,
    ) {
        warn!("Quota exceeded while writing '{}': {}", key, err);
        if !force {
            return;
        }

        let purged = self.delete_all_expires();
        self.stats.record_quota_recovery();
        warn!(
            "Deleted expired entries {:?}, retrying write of '{}'",
            purged, key
        );
        self.store(key, stored_key, stored_value, false);
    }

    // == Sweep ==
    fn delete_all_expires(&mut self) -> Vec<String> {
        let now_ms = self.clock.now_ms();
        let mut expired = Vec::new();

        for stored_key in self.storage.keys() {
            let Some(raw) = self.storage.get_item(&stored_key) else {
                continue;
            };
            // Undecodable slots may belong to someone else; leave them alone
            let Ok(text) = self.gate.decode(&raw) else {
                continue;
            };
            if let Envelope::Valid(entry) = CacheEntry::parse(&text) {
                if !entry.is_live(now_ms) {
                    expired.push(stored_key);
                }
            }
        }
        if expired.is_empty() {
            return expired;
        }

        if let Err(e) = self.storage.remove_items(&expired) {
            error!("Failed to remove {} expired slots: {}", expired.len(), e);
            expired.retain(|stored_key| self.storage.get_item(stored_key).is_none());
        }

        let deleted: Vec<String> = expired
            .into_iter()
            .map(|stored_key| self.gate.decode(&stored_key).unwrap_or(stored_key))
            .collect();
        self.stats.record_expired(deleted.len());
        debug!("Swept {} expired entries", deleted.len());
        deleted
    }
}

// == Support Probe ==
/// Checks the store accepts a write and a remove.
fn is_storage_supported<S: Storage>(storage: &mut S) -> bool {
    let key = format!("__{}", rand::thread_rng().gen_range(0..10_000_000u32));
    match storage
        .set_item(&key, &key)
        .and_then(|()| storage.remove_item(&key))
    {
        Ok(()) => true,
        Err(e) => {
            warn!("Storage is not usable, cache operations are disabled: {}", e);
            false
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{max_expiry, ManualClock, MAX_EXPIRY_MS};
    use crate::error::CacheError;
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone, Utc};
    use serde::Deserialize;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn cache_with(
        storage: MemoryStorage,
        options: CacheOptions,
    ) -> (WebCache<MemoryStorage>, ManualClock) {
        let clock = clock();
        let cache = WebCache::with_clock(storage, options, Arc::new(clock.clone())).unwrap();
        (cache, clock)
    }

    fn new_cache() -> (WebCache<MemoryStorage>, ManualClock) {
        cache_with(MemoryStorage::new(), CacheOptions::session())
    }

    #[test]
    fn test_set_and_get() {
        let (mut cache, _) = new_cache();

        assert_eq!(cache.set("str", "value", SetOptions::default()).unwrap(), "value");
        cache.set("num", 42, SetOptions::default()).unwrap();
        cache.set("list", vec![1, 2, 3], SetOptions::default()).unwrap();

        assert_eq!(cache.get::<_, String>("str").as_deref(), Some("value"));
        assert_eq!(cache.get::<_, i32>("num"), Some(42));
        assert_eq!(cache.get::<_, Vec<i32>>("list"), Some(vec![1, 2, 3]));
        assert_eq!(cache.stats().hits, 3);
    }

    #[test]
    fn test_struct_values() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Profile {
            name: String,
            age: u8,
        }

        let (mut cache, _) = new_cache();
        let profile = Profile {
            name: "Ada".to_string(),
            age: 36,
        };
        cache.set("profile", &profile, SetOptions::default()).unwrap();
        assert_eq!(cache.get::<_, Profile>("profile"), Some(profile));
    }

    #[test]
    fn test_get_missing() {
        let (mut cache, _) = new_cache();
        assert_eq!(cache.get::<_, String>("missing"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_get_wrong_type_is_none() {
        let (mut cache, _) = new_cache();
        cache.set("num", 42, SetOptions::default()).unwrap();
        assert_eq!(cache.get::<_, Vec<String>>("num"), None);
        // Entry is left alone
        assert_eq!(cache.get::<_, i32>("num"), Some(42));
    }

    #[test]
    fn test_stored_form_is_obfuscated() {
        let (mut cache, clock) = new_cache();
        cache.set("a", "x", SetOptions::default()).unwrap();

        let storage = cache.storage().unwrap();
        assert!(storage.get_item("a").is_none());

        let raw = storage.get_item(&cache.encrypt("a")).unwrap();
        let envelope = cache.decrypt(&raw).unwrap();
        assert_eq!(
            CacheEntry::parse(&envelope),
            Envelope::Valid(CacheEntry {
                created_at: clock.now_ms(),
                expires_at: MAX_EXPIRY_MS,
                payload: "\"x\"".to_string(),
            })
        );
    }

    #[test]
    fn test_plain_storage_without_crypt() {
        let (mut cache, _) = cache_with(MemoryStorage::new(), CacheOptions::session().crypt(false));
        assert!(!cache.is_obfuscated());

        cache.set("a", 1, SetOptions::default()).unwrap();
        let raw = cache.storage().unwrap().get_item("a").unwrap();
        assert!(raw.contains(r#""v":"1""#));
    }

    #[test]
    fn test_missing_transform_half_disables_obfuscation() {
        let options =
            CacheOptions::session().transform(None, Some(crate::cache::default_decoder()));
        let (mut cache, _) = cache_with(MemoryStorage::new(), options);

        assert!(!cache.is_obfuscated());
        cache.set("a", 1, SetOptions::default()).unwrap();
        assert!(cache.storage().unwrap().get_item("a").is_some());
        assert_eq!(cache.encrypt("a"), "a");
    }

    #[test]
    fn test_expiry_elapses() {
        let (mut cache, clock) = new_cache();
        cache.set("k", "v", SetOptions::new().exp(3u64)).unwrap();
        assert_eq!(cache.get::<_, String>("k").as_deref(), Some("v"));

        clock.advance(Duration::seconds(3));
        assert_eq!(cache.get::<_, String>("k"), None);
        // Lazily removed on read
        assert!(cache.storage().unwrap().is_empty());
        assert_eq!(cache.stats().expired, 1);
    }

    #[test]
    fn test_default_expiry_applies() {
        let (mut cache, clock) =
            cache_with(MemoryStorage::new(), CacheOptions::session().exp(3u64));
        cache.set("a", "x", SetOptions::default()).unwrap();
        assert_eq!(cache.get::<_, String>("a").as_deref(), Some("x"));

        clock.advance(Duration::milliseconds(2_999));
        assert!(cache.get::<_, String>("a").is_some());

        clock.advance(Duration::milliseconds(1));
        assert!(cache.get::<_, String>("a").is_none());
        assert!(cache.storage().unwrap().is_empty());
    }

    #[test]
    fn test_default_expiry_is_per_instance() {
        let (mut short, clock) =
            cache_with(MemoryStorage::new(), CacheOptions::session().exp(1u64));
        let mut long = WebCache::with_clock(
            MemoryStorage::new(),
            CacheOptions::session(),
            Arc::new(clock.clone()),
        )
        .unwrap();

        short.set("a", 1, SetOptions::default()).unwrap();
        long.set("a", 1, SetOptions::default()).unwrap();
        clock.advance(Duration::days(365));

        assert_eq!(short.get::<_, i32>("a"), None);
        assert_eq!(long.get::<_, i32>("a"), Some(1));
    }

    #[test]
    fn test_past_date_is_immediately_dead() {
        let (mut cache, clock) = new_cache();
        let past = clock.now() - Duration::hours(1);
        cache.set("b", 1, SetOptions::new().exp(past)).unwrap();
        assert_eq!(cache.get::<_, i32>("b"), None);

        // Deadline equal to now is already dead
        cache.set("c", 1, SetOptions::new().exp(clock.now())).unwrap();
        assert_eq!(cache.get::<_, i32>("c"), None);
    }

    #[test]
    fn test_future_date_string() {
        let (mut cache, _) = new_cache();
        cache.set("d", "later", "2030-01-01T00:00:00Z").unwrap();
        assert_eq!(cache.get::<_, String>("d").as_deref(), Some("later"));
    }

    #[test]
    fn test_invalid_expiry_is_reported() {
        let (mut cache, _) = new_cache();
        let result = cache.set("k", "v", "soon-ish");
        assert!(matches!(result, Err(CacheError::InvalidExpiry(_))));
        assert!(cache.storage().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_default_expiry_fails_construction() {
        let result = WebCache::new(MemoryStorage::new(), CacheOptions::session().exp("whenever"));
        assert!(matches!(result, Err(CacheError::InvalidExpiry(_))));
    }

    #[test]
    fn test_never_expiry_uses_max_instant() {
        let (mut cache, _) = cache_with(MemoryStorage::new(), CacheOptions::session().crypt(false));
        cache.set("a", 1, f64::INFINITY).unwrap();
        let raw = cache.storage().unwrap().get_item("a").unwrap();
        let Envelope::Valid(entry) = CacheEntry::parse(&raw) else {
            panic!("expected a valid envelope");
        };
        assert_eq!(entry.expires_at, max_expiry().timestamp_millis());
    }

    #[test]
    fn test_delete() {
        let (mut cache, _) = new_cache();
        cache.set("k", "v", 1u64).unwrap();
        assert_eq!(cache.delete("k"), "k");
        assert_eq!(cache.get::<_, String>("k"), None);
        assert!(cache.storage().unwrap().is_empty());
    }

    #[test]
    fn test_set_or_remove_none_deletes() {
        let (mut cache, _) = new_cache();
        cache.set("k", "v", SetOptions::default()).unwrap();

        let result = cache.set_or_remove::<_, String>("k", None, SetOptions::default()).unwrap();
        assert!(result.is_none());
        assert!(cache.storage().unwrap().is_empty());

        let result = cache.set_or_remove("k", Some(5), SetOptions::default()).unwrap();
        assert_eq!(result, Some(5));
        assert_eq!(cache.get::<_, i32>("k"), Some(5));
    }

    #[test]
    fn test_non_string_keys_are_coerced() {
        let (mut cache, _) = new_cache();
        cache.set(7u32, "seven", SetOptions::default()).unwrap();
        assert_eq!(cache.get::<_, String>("7").as_deref(), Some("seven"));
    }

    #[test]
    fn test_add_only_when_absent() {
        let (mut cache, _) = new_cache();
        assert!(cache.add("k", "1", SetOptions::default()).unwrap());
        assert!(!cache.add("k", "2", SetOptions::default()).unwrap());
        assert_eq!(cache.get::<_, String>("k").as_deref(), Some("1"));
    }

    #[test]
    fn test_add_overwrites_expired() {
        let (mut cache, clock) = new_cache();
        cache.set("k", "1", 1u64).unwrap();
        clock.advance(Duration::seconds(2));

        assert!(cache.add("k", "2", SetOptions::default()).unwrap());
        assert_eq!(cache.get::<_, String>("k").as_deref(), Some("2"));
    }

    #[test]
    fn test_add_overwrites_foreign_data() {
        let (mut cache, _) = cache_with(MemoryStorage::new(), CacheOptions::session().crypt(false));
        cache.storage_mut().unwrap().set_item("k", "not an envelope").unwrap();

        assert!(cache.add("k", 1, SetOptions::default()).unwrap());
        assert_eq!(cache.get::<_, i32>("k"), Some(1));
    }

    #[test]
    fn test_replace_requires_live_entry() {
        let (mut cache, _) = new_cache();
        assert!(!cache.replace("k", "1", SetOptions::default()).unwrap());
        assert_eq!(cache.get::<_, String>("k"), None);
        assert!(cache.storage().unwrap().is_empty());

        cache.add("k", "1", SetOptions::default()).unwrap();
        assert!(cache.replace("k", "2", SetOptions::default()).unwrap());
        assert_eq!(cache.get::<_, String>("k").as_deref(), Some("2"));
    }

    #[test]
    fn test_replace_expired_deletes() {
        let (mut cache, clock) = new_cache();
        cache.set("k", "1", 1u64).unwrap();
        clock.advance(Duration::seconds(1));

        assert!(!cache.replace("k", "2", SetOptions::default()).unwrap());
        assert!(cache.storage().unwrap().is_empty());
    }

    #[test]
    fn test_replace_with_new_expiry() {
        let (mut cache, clock) = new_cache();
        cache.add("k", "1", SetOptions::default()).unwrap();
        cache.replace("k", "1", 1u64).unwrap();

        clock.advance(Duration::seconds(2));
        assert_eq!(cache.get::<_, String>("k"), None);
    }

    #[test]
    fn test_touch_extends_live_entry() {
        let (mut cache, clock) = new_cache();
        cache.set("a", "1", 1u64).unwrap();
        cache.set("b", "2", 1u64).unwrap();
        cache.set("c", "3", SetOptions::default()).unwrap();

        assert!(cache.touch("a", 5u64).unwrap());
        assert!(cache.touch("c", 2u64).unwrap());
        clock.advance(Duration::seconds(3));

        assert_eq!(cache.get::<_, String>("a").as_deref(), Some("1"));
        assert_eq!(cache.get::<_, String>("b"), None);
        assert_eq!(cache.get::<_, String>("c"), None);
    }

    #[test]
    fn test_touch_missing_or_expired() {
        let (mut cache, clock) = new_cache();
        assert!(!cache.touch("missing", 5u64).unwrap());

        cache.set("k", "v", 1u64).unwrap();
        clock.advance(Duration::seconds(1));
        assert!(!cache.touch("k", 5u64).unwrap());
        assert!(cache.storage().unwrap().is_empty());
    }

    #[test]
    fn test_touch_rejects_invalid_expiry() {
        let (mut cache, _) = new_cache();
        cache.set("k", "v", SetOptions::default()).unwrap();
        assert!(matches!(cache.touch("k", "never-ish"), Err(CacheError::InvalidExpiry(_))));
        assert_eq!(cache.get::<_, String>("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_delete_all_expires() {
        let (mut cache, clock) = new_cache();
        cache.set("old", "1", 1u64).unwrap();
        cache.set("older", "2", clock.now()).unwrap();
        cache.set("fresh", "3", SetOptions::default()).unwrap();
        clock.advance(Duration::seconds(1));

        let mut deleted = cache.delete_all_expires();
        deleted.sort();
        assert_eq!(deleted, vec!["old".to_string(), "older".to_string()]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<_, String>("fresh").as_deref(), Some("3"));
        assert_eq!(cache.stats().expired, 2);
    }

    #[test]
    fn test_sweep_skips_foreign_slots() {
        let (mut cache, clock) = new_cache();
        let empty_object = cache.encrypt("{}");
        let storage = cache.storage_mut().unwrap();
        storage.set_item("foreign", "plain text!").unwrap();
        storage.set_item("other", &empty_object).unwrap();
        cache.set("gone", 1, 1u64).unwrap();
        clock.advance(Duration::seconds(5));

        assert_eq!(cache.delete_all_expires(), vec!["gone".to_string()]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_read_outcomes_are_distinguished() {
        let (mut cache, _) = new_cache();
        cache.set("k", 1, SetOptions::default()).unwrap();
        let garbage_key = cache.encrypt("garbage");
        let foreign_key = cache.encrypt("foreign");
        let foreign_value = cache.encrypt("[1,2]");
        let storage = cache.storage_mut().unwrap();
        storage.set_item(&garbage_key, "%%%").unwrap();
        storage.set_item(&foreign_key, &foreign_value).unwrap();

        assert!(matches!(cache.read("k"), Some(ReadOutcome::Found(_))));
        assert!(matches!(cache.read("missing"), Some(ReadOutcome::Absent)));
        assert!(matches!(cache.read("garbage"), Some(ReadOutcome::Undecodable(_))));
        assert!(matches!(cache.read("foreign"), Some(ReadOutcome::Malformed)));

        // All collapse to "no value" for callers
        assert_eq!(cache.get::<_, i32>("garbage"), None);
        assert_eq!(cache.get::<_, i32>("foreign"), None);
    }

    #[test]
    fn test_clear_removes_foreign_keys() {
        let (mut cache, _) = new_cache();
        cache.storage_mut().unwrap().set_item("normal", "value").unwrap();
        cache.set("mine", "v", SetOptions::default()).unwrap();

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get::<_, String>("mine"), None);
    }

    #[test]
    fn test_storage_aliases() {
        let (mut cache, _) = new_cache();
        cache.set_item("a", "hello");
        assert_eq!(cache.get_item("a").as_deref(), Some("hello"));

        cache.set("n", 12, SetOptions::default()).unwrap();
        assert_eq!(cache.get_item("n").as_deref(), Some("12"));

        cache.remove_item("a");
        assert_eq!(cache.get_item("a"), None);
    }

    #[test]
    fn test_get_encrypted_raw() {
        let (mut cache, _) = new_cache();
        cache.set("a", "x", SetOptions::default()).unwrap();

        let raw = cache.get_encrypted_raw("a").unwrap();
        let envelope = cache.decrypt(&raw).unwrap();
        assert!(matches!(CacheEntry::parse(&envelope), Envelope::Valid(_)));

        let (mut plain, _) = cache_with(MemoryStorage::new(), CacheOptions::session().crypt(false));
        plain.set("a", "x", SetOptions::default()).unwrap();
        assert_eq!(plain.get_encrypted_raw("a").as_deref(), Some("x"));
    }

    #[test]
    fn test_encrypt_decrypt_inverse() {
        let (cache, _) = new_cache();
        let text = "Hello World!";
        assert_eq!(cache.decrypt(&cache.encrypt(text)).unwrap(), text);

        let encoded = cache.encrypt(text);
        assert_eq!(cache.encrypt(&cache.decrypt(&encoded).unwrap()), encoded);
    }

    #[test]
    fn test_quota_recovery_purges_and_retries() {
        let (mut cache, clock) =
            cache_with(MemoryStorage::with_quota(400), CacheOptions::session());
        cache.set("old", "x".repeat(100), 1u64).unwrap();
        cache.set("keep", "y".repeat(40), SetOptions::default()).unwrap();
        clock.advance(Duration::seconds(2));

        // Fits only once the expired entry is gone
        cache.set("new", "z".repeat(100), SetOptions::default()).unwrap();

        assert_eq!(cache.get::<_, String>("new"), Some("z".repeat(100)));
        assert_eq!(cache.get::<_, String>("keep"), Some("y".repeat(40)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().quota_recoveries, 1);
    }

    #[test]
    fn test_quota_without_force_drops_write() {
        let (mut cache, clock) =
            cache_with(MemoryStorage::with_quota(400), CacheOptions::session());
        cache.set("old", "x".repeat(100), 1u64).unwrap();
        clock.advance(Duration::seconds(2));

        let value = "z".repeat(200);
        let returned = cache.set("new", value.clone(), SetOptions::new().force(false)).unwrap();
        assert_eq!(returned, value);
        assert_eq!(cache.get::<_, String>("new"), None);
        assert_eq!(cache.stats().quota_recoveries, 0);
    }

    #[test]
    fn test_quota_retry_failure_is_swallowed() {
        let (mut cache, _) = cache_with(MemoryStorage::with_quota(100), CacheOptions::session());

        let result = cache.set("big", "x".repeat(500), SetOptions::default());
        assert!(result.is_ok());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().quota_recoveries, 1);
    }

    #[test]
    fn test_unsupported_storage_is_noop() {
        let (mut cache, _) = cache_with(MemoryStorage::disabled(), CacheOptions::session());
        assert!(!cache.is_supported());
        assert!(cache.storage().is_none());

        assert_eq!(cache.set("k", 1, SetOptions::default()).unwrap(), 1);
        assert_eq!(cache.get::<_, i32>("k"), None);
        assert!(!cache.add("k", 1, SetOptions::default()).unwrap());
        assert!(!cache.replace("k", 1, SetOptions::default()).unwrap());
        assert!(!cache.touch("k", 5u64).unwrap());
        assert!(cache.delete_all_expires().is_empty());
        assert_eq!(cache.get_encrypted_raw("k"), None);
        assert_eq!(cache.get_item("k"), None);
        assert_eq!(cache.len(), 0);
        cache.clear();

        // Transforms pass text through untouched
        assert_eq!(cache.encrypt("plain"), "plain");
        assert_eq!(cache.decrypt("%%% not base64").unwrap(), "%%% not base64");
    }

    #[test]
    fn test_borrowed_storage_outlives_cache() {
        let mut storage = MemoryStorage::new();
        {
            let mut cache =
                WebCache::new(&mut storage, CacheOptions::session().crypt(false)).unwrap();
            cache.set("k", "v", SetOptions::default()).unwrap();
        }
        assert!(storage.get_item("k").is_some());
    }

    // == Scripted Backend ==
    /// Store whose Nth writes fail with a chosen error; write 1 is the support probe.
    #[derive(Debug)]
    struct ScriptedStorage {
        inner: MemoryStorage,
        writes: usize,
        fail_on: Vec<usize>,
        reject: fn() -> StorageError,
        bulk_removals: usize,
    }

    impl ScriptedStorage {
        fn new(fail_on: Vec<usize>, reject: fn() -> StorageError) -> Self {
            Self {
                inner: MemoryStorage::new(),
                writes: 0,
                fail_on,
                reject,
                bulk_removals: 0,
            }
        }
    }

    impl Storage for ScriptedStorage {
        fn len(&self) -> usize {
            self.inner.len()
        }

        fn key(&self, index: usize) -> Option<String> {
            self.inner.key(index)
        }

        fn get_item(&self, key: &str) -> Option<String> {
            self.inner.get_item(key)
        }

        fn set_item(&mut self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
            self.writes += 1;
            if self.fail_on.contains(&self.writes) {
                return Err((self.reject)());
            }
            self.inner.set_item(key, value)
        }

        fn remove_item(&mut self, key: &str) -> std::result::Result<(), StorageError> {
            self.inner.remove_item(key)
        }

        fn remove_items(&mut self, keys: &[String]) -> std::result::Result<(), StorageError> {
            self.bulk_removals += 1;
            self.inner.remove_items(keys)
        }

        fn clear(&mut self) -> std::result::Result<(), StorageError> {
            self.inner.clear()
        }
    }

    fn scripted_cache(storage: ScriptedStorage) -> (WebCache<ScriptedStorage>, ManualClock) {
        let clock = clock();
        let cache =
            WebCache::with_clock(storage, CacheOptions::session(), Arc::new(clock.clone()))
                .unwrap();
        (cache, clock)
    }

    fn quota_reached() -> StorageError {
        StorageError::Rejected {
            code: 1014,
            name: "NS_ERROR_DOM_QUOTA_REACHED".to_string(),
            message: "persistent storage maximum size reached".to_string(),
        }
    }

    #[test]
    fn test_rejected_write_is_swallowed_without_recovery() {
        let storage = ScriptedStorage::new(vec![2], || StorageError::security("denied"));
        let (mut cache, _) = scripted_cache(storage);
        assert!(cache.is_supported());

        assert_eq!(cache.set("k", 5, SetOptions::default()).unwrap(), 5);
        assert_eq!(cache.get::<_, i32>("k"), None);

        let stats = cache.stats();
        assert_eq!(stats.writes, 0);
        assert_eq!(stats.quota_recoveries, 0);
        // No retry after a non-quota failure
        assert_eq!(cache.storage().unwrap().writes, 2);
    }

    #[test]
    fn test_quota_reached_variant_triggers_recovery() {
        let (mut cache, clock) = scripted_cache(ScriptedStorage::new(vec![3], quota_reached));
        cache.set("old", "x", 1u64).unwrap();
        clock.advance(Duration::seconds(2));

        cache.set("new", "y", SetOptions::default()).unwrap();

        assert_eq!(cache.get::<_, String>("new").as_deref(), Some("y"));
        assert_eq!(cache.len(), 1);
        let stats = cache.stats();
        assert_eq!(stats.quota_recoveries, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(cache.storage().unwrap().writes, 4);
    }

    #[test]
    fn test_quota_reached_without_force_skips_recovery() {
        let (mut cache, _) = scripted_cache(ScriptedStorage::new(vec![2], quota_reached));

        let returned = cache.set("k", "v", SetOptions::new().force(false)).unwrap();
        assert_eq!(returned, "v");
        assert_eq!(cache.get::<_, String>("k"), None);
        assert_eq!(cache.stats().quota_recoveries, 0);
        assert_eq!(cache.storage().unwrap().writes, 2);
    }

    #[test]
    fn test_sweep_removes_in_one_batch() {
        let (mut cache, clock) = scripted_cache(ScriptedStorage::new(Vec::new(), quota_reached));
        for key in ["a", "b", "c"] {
            cache.set(key, 1, 1u64).unwrap();
        }
        cache.set("live", 1, SetOptions::default()).unwrap();

        // Nothing expired yet, nothing to remove
        assert!(cache.delete_all_expires().is_empty());
        assert_eq!(cache.storage().unwrap().bulk_removals, 0);

        clock.advance(Duration::seconds(1));
        let mut deleted = cache.delete_all_expires();
        deleted.sort();
        assert_eq!(deleted, vec!["a", "b", "c"]);
        assert_eq!(cache.storage().unwrap().bulk_removals, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_remaining() {
        let (mut cache, clock) = new_cache();
        cache.set("k", "v", 10u64).unwrap();
        assert_eq!(cache.ttl_remaining_ms("k"), Some(10_000));

        clock.advance(Duration::milliseconds(2_500));
        assert_eq!(cache.ttl_remaining_ms("k"), Some(7_500));
        assert_eq!(cache.ttl_remaining_ms("missing"), None);

        clock.advance(Duration::seconds(10));
        assert_eq!(cache.ttl_remaining_ms("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_open_degrades_on_corrupt_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut cache = WebCache::open(CacheOptions::local(path.clone())).unwrap();
        assert!(!cache.is_supported());
        assert_eq!(cache.set("k", 1, SetOptions::default()).unwrap(), 1);
        assert_eq!(cache.get::<_, i32>("k"), None);

        // File is left as it was
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");

        // A bad default expiry is still reported
        let result = WebCache::open(CacheOptions::local(path.clone()).exp("whenever"));
        assert!(matches!(result, Err(CacheError::InvalidExpiry(_))));
    }
}
