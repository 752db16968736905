//! Storage backend trait definition.

use async_trait::async_trait;

use crate::error::StorageError;

/// Storage backend trait for implementing different storage engines.
///
/// Writes are create-only: there is no overwrite or delete.
/// Records that must never change (the service identity) live behind it.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get a value by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert a value under a key that must not exist yet.
    ///
    /// The check and the insert are a single atomic operation at the storage
    /// layer. When the key is already present the call fails with
    /// [`StorageError::AlreadyExists`] and nothing is written.
    async fn create(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }
}
