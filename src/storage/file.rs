//! File-backed store
//!
//! Keeps slots in memory and rewrites the whole JSON file after every
//! mutation, so a store survives process restarts.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::{MemoryStorage, Storage, StorageError};

// == File Storage ==
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    inner: MemoryStorage,
}

impl FileStorage {
    /// Opens the store at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>, quota_bytes: Option<usize>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let items: BTreeMap<String, String> = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened file storage at {} with {} slots", path.display(), items.len());

        Ok(Self {
            path,
            inner: MemoryStorage::from_items(items, quota_bytes),
        })
    }

    /// Writes the current slots to a sibling temp file, then renames it over the target.
    fn persist(&self) -> Result<(), StorageError> {
        let text = serde_json::to_string(self.inner.items())?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Applies a mutation and persists it, restoring the previous slots if the write fails.
    fn mutate<F>(&mut self, op: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut MemoryStorage) -> Result<(), StorageError>,
    {
        let snapshot = self.inner.clone();
        op(&mut self.inner)?;
        if let Err(e) = self.persist() {
            self.inner = snapshot;
            return Err(e);
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn key(&self, index: usize) -> Option<String> {
        self.inner.key(index)
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|inner| inner.set_item(key, value))
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.mutate(|inner| inner.remove_item(key))
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    /// Removes all `keys` and rewrites the file once.
    fn remove_items(&mut self, keys: &[String]) -> Result<(), StorageError> {
        self.mutate(|inner| inner.remove_items(keys))
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.mutate(|inner| inner.clear())
    }
}
