//! Storage Module
//!
//! The key/value contract the cache is layered over, plus two backends:
//! an in-memory "session" store and a JSON-file "local" store.

mod error;
mod file;
mod memory;

use std::path::PathBuf;

pub use error::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Default file used by [`StorageKind::Local`].
pub const DEFAULT_LOCAL_PATH: &str = "webcache.json";

// == Storage Trait ==
/// Minimal synchronous key/value store, enumerable by positional index.
///
/// Slot order is whatever the backend reports; it only has to stay stable
/// between mutations.
pub trait Storage {
    /// Number of stored slots.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key stored in slot `index`, or None when out of range.
    fn key(&self, index: usize) -> Option<String>;

    fn get_item(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;

    /// Keys of every slot, in index order.
    fn keys(&self) -> Vec<String> {
        (0..self.len()).filter_map(|index| self.key(index)).collect()
    }

    /// Removes several slots in one mutation where the backend supports it.
    fn remove_items(&mut self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.remove_item(key)?;
        }
        Ok(())
    }

    /// Removes every slot, including ones not written by the cache.
    fn clear(&mut self) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn key(&self, index: usize) -> Option<String> {
        (**self).key(index)
    }

    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn remove_items(&mut self, keys: &[String]) -> Result<(), StorageError> {
        (**self).remove_items(keys)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn key(&self, index: usize) -> Option<String> {
        (**self).key(index)
    }

    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn remove_items(&mut self, keys: &[String]) -> Result<(), StorageError> {
        (**self).remove_items(keys)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

/// Boxed store handed out by [`StorageKind::open`].
pub type DynStorage = Box<dyn Storage + Send + Sync>;

// == Storage Selector ==
/// Selects which backend a cache binds to when opened by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    /// Persistent store backed by a JSON file
    Local { path: PathBuf },
    /// In-memory store living as long as the process
    Session,
}

impl Default for StorageKind {
    fn default() -> Self {
        StorageKind::Local {
            path: PathBuf::from(DEFAULT_LOCAL_PATH),
        }
    }
}

impl StorageKind {
    /// Parses a selector name (`"local"`/`"localStorage"` or `"session"`/`"sessionStorage"`).
    ///
    /// Local stores are placed at `path`.
    pub fn from_name(name: &str, path: impl Into<PathBuf>) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "local" | "localstorage" => Some(StorageKind::Local { path: path.into() }),
            "session" | "sessionstorage" => Some(StorageKind::Session),
            _ => None,
        }
    }

    /// Opens the selected backend with an optional byte quota.
    pub fn open(&self, quota_bytes: Option<usize>) -> Result<DynStorage, StorageError> {
        match self {
            StorageKind::Local { path } => Ok(Box::new(FileStorage::open(path, quota_bytes)?)),
            StorageKind::Session => Ok(Box::new(match quota_bytes {
                Some(quota) => MemoryStorage::with_quota(quota),
                None => MemoryStorage::new(),
            })),
        }
    }
}
