//! Ingress pipeline: turn a request payload into one file in the upload
//! directory.
//!
//! The multipart variant tees the file part into the local file while the
//! remote store reads it, so both copies are written in one pass. The URL
//! variant downloads into a local file only; its remote upload happens later
//! from disk.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use futures::{StreamExt, TryStreamExt};
use mediagate_core::{AppError, Config};
use mediagate_processing::tee::TeeSink;
use mediagate_processing::{reserve_unique, sanitize, TeeReader};
use mediagate_storage::RemoteStore;
use percent_encoding::percent_decode_str;
use reqwest::Url;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

use super::artifacts::ArtifactGuard;
use super::storage_call;
use crate::error::IntoAppError;
use crate::utils::url_fetch::{FetchError, UrlFetcher};

/// The canonical local file produced by ingestion.
#[derive(Debug, Clone)]
pub struct Ingested {
    /// Collision-free name inside the upload directory.
    pub file_name: String,
    pub path: PathBuf,
    /// Sanitized name the remote object is stored under.
    pub remote_name: String,
    /// The client's sanitized `file_name`, if it sent one.
    pub preferred_name: Option<String>,
    pub folder_id: Option<String>,
    /// Set when the remote upload already happened during ingestion.
    pub remote_id: Option<String>,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Sanitize an optional client-supplied name, rejecting invalid ones.
pub fn sanitize_preferred(name: Option<String>) -> Result<Option<String>, AppError> {
    name.and_then(non_empty)
        .map(|n| sanitize(&n).map_err(IntoAppError::into_app_error))
        .transpose()
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// Read the form in arrival order and ingest the `file` part.
///
/// `folder_id` and `file_name` are honoured when they arrive before the file
/// part; anything after it is not read.
pub async fn ingest_multipart(
    config: &Config,
    store: &dyn RemoteStore,
    mut multipart: Multipart,
    guard: &mut ArtifactGuard,
) -> Result<Ingested, AppError> {
    fs::create_dir_all(config.upload_dir()).await?;

    let mut folder_id: Option<String> = None;
    let mut preferred: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("folder_id") => {
                folder_id = non_empty(field.text().await.map_err(multipart_error)?);
            }
            Some("file_name") => {
                preferred = sanitize_preferred(Some(field.text().await.map_err(multipart_error)?))?;
            }
            Some("file") => {
                return ingest_field(config, store, field, folder_id, preferred, guard).await;
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown form field");
            }
        }
    }

    Err(AppError::InvalidInput("No file uploaded".to_string()))
}

async fn ingest_field(
    config: &Config,
    store: &dyn RemoteStore,
    field: Field<'_>,
    folder_id: Option<String>,
    preferred: Option<String>,
    guard: &mut ArtifactGuard,
) -> Result<Ingested, AppError> {
    let remote_name = match preferred.clone() {
        Some(name) => name,
        None => {
            let declared = field.file_name().unwrap_or_default().to_string();
            sanitize(&declared).map_err(IntoAppError::into_app_error)?
        }
    };

    let (file_name, path, file) =
        reserve_unique(config.upload_dir(), &remote_name, config.max_name_attempts())
            .await
            .map_err(IntoAppError::into_app_error)?;
    guard.track_file(path.clone());

    // A broken request body surfaces inside the store as an io error; keep
    // the original so the client gets the right status.
    let body_error: Arc<Mutex<Option<AppError>>> = Arc::new(Mutex::new(None));
    let slot = body_error.clone();
    let body = field.map_err(move |e| {
        let message = e.body_text();
        if let Ok(mut first) = slot.lock() {
            first.get_or_insert(multipart_error(e));
        }
        io::Error::other(message)
    });

    let sinks: Vec<TeeSink> = vec![Box::new(file)];
    let tee = TeeReader::new(StreamReader::new(Box::pin(body)), sinks);
    let progress = tee.progress();

    tracing::debug!(
        file_name = %file_name,
        remote_name = %remote_name,
        folder_id = ?folder_id,
        "Streaming upload to disk and remote store"
    );

    let uploaded = storage_call(
        config.storage_timeout(),
        store.upload(&remote_name, folder_id.as_deref(), Box::pin(tee)),
    )
    .await;

    let taken = body_error.lock().ok().and_then(|mut slot| slot.take());
    if let Some(err) = taken {
        return Err(err);
    }
    let remote_id = uploaded?;
    guard.track_remote(remote_id.clone());

    if !progress.is_complete() {
        return Err(AppError::Storage(
            "Remote store stopped reading before the end of the upload".to_string(),
        ));
    }

    tracing::info!(
        file_name = %file_name,
        remote_id = %remote_id,
        size_bytes = progress.bytes(),
        "Upload stored locally and remotely"
    );

    Ok(Ingested {
        file_name,
        path,
        remote_name,
        preferred_name: preferred,
        folder_id,
        remote_id: Some(remote_id),
    })
}

/// Local name for a downloaded file: the last path segment of the URL, or a
/// timestamped fallback when that is not a usable name.
pub fn url_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|segment| percent_decode_str(segment).decode_utf8().ok())
        .and_then(|segment| sanitize(&segment).ok())
        .unwrap_or_else(|| format!("download-{}.tmp", chrono::Utc::now().timestamp()))
}

/// Fetch `url` through the guard and save the body into the upload directory.
pub async fn ingest_url(
    config: &Config,
    fetcher: &UrlFetcher,
    url: &str,
    folder_id: Option<String>,
    preferred: Option<String>,
    guard: &mut ArtifactGuard,
) -> Result<Ingested, AppError> {
    let fetched = fetcher.fetch(url).await?;
    let limit = config.max_upload_size_bytes() as u64;
    if fetched.response.content_length().is_some_and(|len| len > limit) {
        return Err(FetchError::TooLarge(limit).into());
    }

    fs::create_dir_all(config.upload_dir()).await?;
    let disk_name = url_file_name(&fetched.requested);
    let (file_name, path, mut file) =
        reserve_unique(config.upload_dir(), &disk_name, config.max_name_attempts())
            .await
            .map_err(IntoAppError::into_app_error)?;
    guard.track_file(path.clone());

    let mut written: u64 = 0;
    let mut body = Box::pin(fetched.response.bytes_stream());
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| fetcher.classify_transport(e))?;
        written += chunk.len() as u64;
        if written > limit {
            return Err(FetchError::TooLarge(limit).into());
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::info!(
        url = %fetched.requested,
        file_name = %file_name,
        size_bytes = written,
        "Remote file downloaded"
    );

    let remote_name = preferred.clone().unwrap_or(disk_name);
    Ok(Ingested {
        file_name,
        path,
        remote_name,
        preferred_name: preferred,
        folder_id,
        remote_id: None,
    })
}
