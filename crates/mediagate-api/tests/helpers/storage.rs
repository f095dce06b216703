//! Remote store and extractor doubles.

#![allow(dead_code)]

use async_trait::async_trait;
use mediagate_processing::{AudioExtractor, ExtractError};
use mediagate_storage::{RemoteStore, StorageBackend, StorageError, StorageResult, UploadReader};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempPath;

use super::fixtures;

/// Store whose uploads always fail without reading the body.
pub struct FailingStore;

#[async_trait]
impl RemoteStore for FailingStore {
    async fn upload<'a>(
        &self,
        _name: &str,
        _folder_id: Option<&str>,
        _reader: UploadReader<'a>,
    ) -> StorageResult<String> {
        Err(StorageError::UploadFailed("backend unavailable".to_string()))
    }

    async fn delete(&self, _remote_id: &str) -> StorageResult<()> {
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Delegates to another store but fails its `fail_on`-th upload (1-based).
pub struct FailNthUpload {
    inner: Arc<dyn RemoteStore>,
    fail_on: usize,
    uploads: AtomicUsize,
}

impl FailNthUpload {
    pub fn new(inner: Arc<dyn RemoteStore>, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            uploads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteStore for FailNthUpload {
    async fn upload<'a>(
        &self,
        name: &str,
        folder_id: Option<&str>,
        reader: UploadReader<'a>,
    ) -> StorageResult<String> {
        let count = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if count == self.fail_on {
            return Err(StorageError::UploadFailed(format!("upload #{} refused", count)));
        }
        self.inner.upload(name, folder_id, reader).await
    }

    async fn delete(&self, remote_id: &str) -> StorageResult<()> {
        self.inner.delete(remote_id).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}

/// Extractor that writes a fixed MP3 instead of running a tool, counting
/// how often it was asked.
#[derive(Default)]
pub struct FakeExtractor {
    calls: Arc<AtomicUsize>,
}

impl FakeExtractor {
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl AudioExtractor for FakeExtractor {
    async fn extract_audio(&self, _video: &Path) -> Result<TempPath, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let file = tempfile::NamedTempFile::new().map_err(ExtractError::TempFile)?;
        std::fs::write(file.path(), fixtures::create_minimal_mp3()).map_err(ExtractError::TempFile)?;
        Ok(file.into_temp_path())
    }

    fn tool_name(&self) -> &str {
        "fake-ffmpeg"
    }
}
