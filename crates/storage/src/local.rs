//! Local-filesystem storage provider for development and tests.
//!
//! Keys map to paths under a root directory. Keys are sanitised against
//! traversal: any `..` segment is rejected.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::{StorageError, StorageProvider};

/// Stores attachment bytes under a directory on the local disk.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve a key to a path under the root, rejecting traversal.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let traverses = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if traverses || key.is_empty() {
            return Err(StorageError::Backend(format!("invalid storage key: {key}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Local development has no CDN in front; the "presigned URL" is the
    /// API's own download route.
    async fn presign_get(&self, key: &str, _expires_secs: u64) -> Result<String, StorageError> {
        self.resolve(key)?;
        Ok(format!("/api/v1/files/{key}"))
    }
}
