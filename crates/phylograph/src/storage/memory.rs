//! In-memory storage backend.
//!
//! All data is lost when the last clone of the backend is dropped. Clones share
//! the same data, so a test can keep a handle to the backend a store owns and
//! inject a commit failure with [`MemoryBackend::fail_next_batch`].

use super::{BatchOperation, KeyValue, StorageBackend};
use crate::error::{Result, StoreError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Data = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory storage backend using a BTreeMap.
///
/// Data is stored in a thread-safe `BTreeMap` behind an `Arc<RwLock<>>`.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<Data>>,
    fail_next_batch: Arc<AtomicBool>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of key-value pairs stored.
    pub fn len(&self) -> usize {
        self.read().map(|data| data.len()).unwrap_or(0)
    }

    /// Check if the backend is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all data from the backend.
    pub fn clear(&mut self) {
        if let Ok(mut data) = self.write() {
            data.clear();
        }
    }

    /// Make the next [`write_batch`](StorageBackend::write_batch) fail without
    /// applying any of its operations.
    pub fn fail_next_batch(&self) {
        self.fail_next_batch.store(true, Ordering::SeqCst);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Data>> {
        self.data
            .read()
            .map_err(|_| StoreError::storage("Memory backend lock poisoned", None::<std::io::Error>))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Data>> {
        self.data
            .write()
            .map_err(|_| StoreError::storage("Memory backend lock poisoned", None::<std::io::Error>))
    }
}

impl StorageBackend for MemoryBackend {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.write()?.remove(key);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.read()?.contains_key(key))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KeyValue>> {
        let data = self.read()?;
        let results: Vec<KeyValue> = data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }

    fn write_batch(&mut self, operations: Vec<BatchOperation>) -> Result<()> {
        if self.fail_next_batch.swap(false, Ordering::SeqCst) {
            return Err(StoreError::storage(
                "Injected batch failure",
                None::<std::io::Error>,
            ));
        }

        let mut data = self.write()?;
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // No-op for in-memory backend
        Ok(())
    }
}
