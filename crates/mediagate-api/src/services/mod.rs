//! The ingestion pipeline behind the upload handlers.

pub mod artifacts;
pub mod assembler;
pub mod ingest;

pub use artifacts::ArtifactGuard;
pub use assembler::{assemble, UploadResponse};
pub use ingest::{ingest_multipart, ingest_url, Ingested};

use crate::error::IntoAppError;
use mediagate_core::AppError;
use mediagate_storage::StorageResult;
use std::future::Future;
use std::time::Duration;

/// Run a remote-store call under the storage timeout.
pub(crate) async fn storage_call<T>(
    limit: Duration,
    call: impl Future<Output = StorageResult<T>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(IntoAppError::into_app_error),
        Err(_) => Err(AppError::Storage(format!(
            "Remote store did not respond within {}s",
            limit.as_secs()
        ))),
    }
}
