//! Backend selection from configuration.

#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{RemoteStore, StorageBackend, StorageError, StorageResult};
use mediagate_core::Config;
use std::sync::Arc;

/// Create the remote store selected by `STORAGE_BACKEND` (local by default).
pub async fn create_store(config: &Config) -> StorageResult<Arc<dyn RemoteStore>> {
    let backend = config.storage_backend().unwrap_or(StorageBackend::Local);
    tracing::debug!(backend = %backend, "Selecting remote store");

    match backend {
        StorageBackend::S3 => s3_store(config).await,
        StorageBackend::Local => local_store(config).await,
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> StorageResult<&'a str> {
    value.ok_or_else(|| StorageError::ConfigError(format!("{} not configured", key)))
}

#[allow(dead_code)]
fn disabled(backend: StorageBackend, feature: &str) -> StorageError {
    StorageError::ConfigError(format!(
        "{} storage backend not available ({} feature not enabled)",
        backend, feature
    ))
}

#[cfg(feature = "storage-s3")]
async fn s3_store(config: &Config) -> StorageResult<Arc<dyn RemoteStore>> {
    let bucket = required(config.s3_bucket(), "S3_BUCKET")?;
    let region = required(
        config.s3_region().or_else(|| config.aws_region()),
        "S3_REGION or AWS_REGION",
    )?;

    let store = S3Storage::new(
        bucket.to_string(),
        region.to_string(),
        config.s3_endpoint().map(String::from),
    )
    .await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "storage-s3"))]
async fn s3_store(_config: &Config) -> StorageResult<Arc<dyn RemoteStore>> {
    Err(disabled(StorageBackend::S3, "storage-s3"))
}

#[cfg(feature = "storage-local")]
async fn local_store(config: &Config) -> StorageResult<Arc<dyn RemoteStore>> {
    let base_path = required(config.local_storage_path(), "LOCAL_STORAGE_PATH")?;
    Ok(Arc::new(LocalStorage::new(base_path).await?))
}

#[cfg(not(feature = "storage-local"))]
async fn local_store(_config: &Config) -> StorageResult<Arc<dyn RemoteStore>> {
    Err(disabled(StorageBackend::Local, "storage-local"))
}
