//! Storage backend abstractions and implementations.
//!
//! This module defines the [`StorageBackend`] trait and provides implementations:
//! - [`RocksDBBackend`]: Persistent storage (feature `rocksdb-backend`)
//! - [`MemoryBackend`]: In-memory storage for tests and scratch stores
//!
//! The tree graph only writes through [`StorageBackend::write_batch`]: every
//! transaction commits as one batch, so a store never observes half of an
//! ingestion, reroot or working-copy transition.

mod memory;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_backend;

pub use memory::MemoryBackend;
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::RocksDBBackend;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Key-value pair for storage operations.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Trait defining the storage backend interface.
///
/// All storage operations are explicit and return `Result` to handle failures.
/// Implementations must apply [`write_batch`](StorageBackend::write_batch) atomically.
///
/// The single-key operations [`put`](StorageBackend::put),
/// [`delete`](StorageBackend::delete) and [`exists`](StorageBackend::exists)
/// are not used by the tree graph. They remain part of the contract for code
/// that inspects or repairs a store's key space directly.
pub trait StorageBackend: Send + Sync {
    /// Store a key-value pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`](crate::StoreError::Storage) if the write fails.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Retrieve a value by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`](crate::StoreError::Storage) if the read fails.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Delete a key-value pair. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`](crate::StoreError::Storage) if the delete fails.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Check if a key exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`](crate::StoreError::Storage) if the check fails.
    fn exists(&self, key: &[u8]) -> Result<bool>;

    /// Collect all key-value pairs whose keys start with the given prefix.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`](crate::StoreError::Storage) if iteration fails.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KeyValue>>;

    /// Execute a batch of write operations atomically.
    ///
    /// Either all operations succeed or none do.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`](crate::StoreError::Storage) if the batch fails.
    fn write_batch(&mut self, operations: Vec<BatchOperation>) -> Result<()>;

    /// Flush any buffered writes to disk.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`](crate::StoreError::Storage) if flush fails.
    fn flush(&mut self) -> Result<()>;
}

/// Batch write operation for atomic updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchOperation {
    /// Put a key-value pair
    Put {
        /// Key to write
        key: Vec<u8>,
        /// Value to write
        value: Vec<u8>,
    },
    /// Delete a key
    Delete {
        /// Key to delete
        key: Vec<u8>,
    },
}
