//! Remote storage abstraction trait

use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte source handed to [`RemoteStore::upload`]. The lifetime lets callers
/// pass readers that borrow request state, such as a multipart field.
pub type UploadReader<'a> = Pin<Box<dyn AsyncRead + Send + Unpin + 'a>>;

/// Remote storage abstraction
///
/// Implementations consume the reader until EOF and return an opaque
/// identifier owned by the backend.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload everything `reader` yields under `name` in `folder_id`
    /// (`None` means the backend's default container).
    async fn upload<'a>(
        &self,
        name: &str,
        folder_id: Option<&str>,
        reader: UploadReader<'a>,
    ) -> StorageResult<String>;

    /// Upload a file that is already on local disk.
    async fn upload_from_path(
        &self,
        name: &str,
        folder_id: Option<&str>,
        path: &Path,
    ) -> StorageResult<String> {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to open {}: {}", path.display(), e))
        })?;
        self.upload(name, folder_id, Box::pin(file)).await
    }

    /// Remove a previously uploaded object. Used to compensate when a later
    /// step of a request fails; deleting a missing object is not an error.
    async fn delete(&self, remote_id: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
