//! In-memory store
//!
//! Ordered map with optional byte quota. Also stands in for a store the
//! host has disabled, which rejects every write.

use std::collections::BTreeMap;

use crate::storage::{Storage, StorageError};

// == Memory Storage ==
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    /// Slots ordered by key
    items: BTreeMap<String, String>,
    /// Maximum bytes of keys plus values, None = unlimited
    quota_bytes: Option<usize>,
    /// Bytes currently used by keys plus values
    used_bytes: usize,
    /// Rejects all writes when set
    disabled: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects writes pushing usage past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Creates a store whose writes always fail, like storage turned off by the host.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub(crate) fn from_items(items: BTreeMap<String, String>, quota_bytes: Option<usize>) -> Self {
        let used_bytes = items.iter().map(|(k, v)| k.len() + v.len()).sum();
        Self {
            items,
            quota_bytes,
            used_bytes,
            disabled: false,
        }
    }

    pub(crate) fn items(&self) -> &BTreeMap<String, String> {
        &self.items
    }

    /// Bytes used by keys plus values.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }
}

impl Storage for MemoryStorage {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn key(&self, index: usize) -> Option<String> {
        self.items.keys().nth(index).cloned()
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.disabled {
            return Err(StorageError::security("storage is disabled"));
        }

        let previous = self.items.get(key).map_or(0, |old| key.len() + old.len());
        let needed = self.used_bytes - previous + key.len() + value.len();
        if let Some(quota) = self.quota_bytes {
            if needed > quota {
                return Err(StorageError::quota_exceeded(format!(
                    "writing '{}' needs {} bytes, quota is {}",
                    key, needed, quota
                )));
            }
        }

        self.items.insert(key.to_string(), value.to_string());
        self.used_bytes = needed;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        if let Some(old) = self.items.remove(key) {
            self.used_bytes -= key.len() + old.len();
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    fn remove_items(&mut self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.remove_item(key)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.items.clear();
        self.used_bytes = 0;
        Ok(())
    }
}
