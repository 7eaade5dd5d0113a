//! Object storage provider trait.

use async_trait::async_trait;
use runbridge_core::types::Timestamp;

/// Errors from the object storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A request to the storage backend failed.
    #[error("Storage request failed: {0}")]
    Request(String),

    /// The caller handed us something we cannot store.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Metadata for one stored object, as returned by listing.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub last_modified: Option<Timestamp>,
    pub size: Option<i64>,
}

/// Bucket operations the platform needs.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to
/// call concurrently from request handlers and background tasks.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store an object under `key` with the given content type, publicly
    /// readable.
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Delete the object under `key`. Deleting a missing key is not an
    /// error.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// List up to `max_keys` objects under `prefix`.
    async fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
    ) -> Result<Vec<StoredObject>, StorageError>;
}
