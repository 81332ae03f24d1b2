//! Attachment blob storage.
//!
//! [`StorageProvider`] abstracts where attachment bytes live. Production
//! deployments use the S3 provider; development and tests use the local
//! filesystem provider. Metadata (name, size, owner) stays in Postgres —
//! providers deal in opaque keys and bytes only.

pub mod local;
pub mod s3;

use async_trait::async_trait;

pub use local::LocalStorage;
pub use s3::S3Storage;

/// Error type shared by all providers.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Where attachment bytes are stored.
///
/// Keys are generated by the caller (`{company_id}/{uuid}/{file_name}`) and
/// treated as opaque here.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Store `bytes` under `key`, overwriting any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// Fetch the object at `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete the object at `key`. Deleting a missing object is not an
    /// error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// A URL from which the object can be downloaded for a limited time.
    async fn presign_get(&self, key: &str, expires_secs: u64) -> Result<String, StorageError>;
}
