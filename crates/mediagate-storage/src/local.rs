use crate::keys::object_key;
use crate::traits::{RemoteStore, StorageError, StorageResult, UploadReader};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Filesystem-backed remote store.
///
/// Mirrors uploads into a directory tree using the same key layout as the
/// object-store backends. Handy for single-host deployments and tests.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `base_path`, creating it if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation.
    ///
    /// Keys embed client file names, so `..` is only refused as a whole
    /// path component; `take..2.mp3` is a valid key segment.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        let escapes = Path::new(storage_key).components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if storage_key.is_empty() || escapes {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }
}

/// Copy `reader` into `file` and make it durable. The file handle is closed
/// on return either way, so the caller can remove a partial object.
async fn write_object(reader: &mut UploadReader<'_>, mut file: fs::File) -> std::io::Result<u64> {
    let copied = tokio::io::copy(reader, &mut file).await?;
    file.sync_all().await?;
    Ok(copied)
}

#[async_trait]
impl RemoteStore for LocalStorage {
    async fn upload<'a>(
        &self,
        name: &str,
        folder_id: Option<&str>,
        mut reader: UploadReader<'a>,
    ) -> StorageResult<String> {
        let key = object_key(folder_id, name)?;
        let path = self.key_to_path(&key)?;
        let start = std::time::Instant::now();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = match write_object(&mut reader, file).await {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&path).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(key)
    }

    async fn delete(&self, remote_id: &str) -> StorageResult<()> {
        let path = self.key_to_path(remote_id)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %remote_id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
