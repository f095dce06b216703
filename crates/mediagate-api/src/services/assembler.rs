//! Response assembly: classify the ingested file, derive audio from video,
//! and build the client-facing result.
//!
//! Every artifact created on the way is registered with the request's
//! [`ArtifactGuard`]; any error returned from here leaves the guard to undo
//! them.

use mediagate_core::AppError;
use mediagate_processing::{audio_file_name, classify, persist_generated, MediaKind};
use mediagate_storage::RemoteStore;
use serde::Serialize;
use std::path::Path;

use super::artifacts::ArtifactGuard;
use super::ingest::Ingested;
use super::storage_call;
use crate::error::IntoAppError;
use crate::state::AppState;
use crate::utils::{public_file_url, RequestOrigin};

/// Identifiers and public URLs of the stored artifacts. Audio uploads fill
/// only the audio pair; video uploads fill both.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResponse {
    pub video_file_id: Option<String>,
    pub audio_file_id: Option<String>,
    pub video_file_url: Option<String>,
    pub audio_file_url: Option<String>,
}

async fn upload_from_disk(
    state: &AppState,
    store: &dyn RemoteStore,
    name: &str,
    folder_id: Option<&str>,
    path: &Path,
) -> Result<String, AppError> {
    storage_call(
        state.config.storage_timeout(),
        store.upload_from_path(name, folder_id, path),
    )
    .await
}

pub async fn assemble(
    state: &AppState,
    store: &dyn RemoteStore,
    ingested: Ingested,
    origin: &RequestOrigin,
    guard: &mut ArtifactGuard,
) -> Result<UploadResponse, AppError> {
    let config = &state.config;
    let mime = classify(&ingested.path).await?;
    let kind = MediaKind::of(&mime);
    tracing::debug!(file_name = %ingested.file_name, mime = %mime, kind = ?kind, "Classified upload");

    if kind == MediaKind::Unsupported {
        return Err(AppError::UnsupportedMedia(mime));
    }

    let primary_id = match ingested.remote_id.clone() {
        Some(id) => id,
        None => {
            let id = upload_from_disk(
                state,
                store,
                &ingested.remote_name,
                ingested.folder_id.as_deref(),
                &ingested.path,
            )
            .await?;
            guard.track_remote(id.clone());
            id
        }
    };
    let primary_url = public_file_url(config.public_base_url(), origin, &ingested.file_name);

    if kind == MediaKind::Audio {
        return Ok(UploadResponse {
            audio_file_id: Some(primary_id),
            audio_file_url: Some(primary_url),
            ..Default::default()
        });
    }

    let temp_audio = state
        .extractor
        .extract_audio(&ingested.path)
        .await
        .map_err(IntoAppError::into_app_error)?;

    // Named after the requested name, never the suffixed local one.
    let audio_name = audio_file_name(
        ingested.preferred_name.as_deref(),
        Path::new(&ingested.remote_name),
    );
    let (audio_disk_name, audio_path) = persist_generated(
        temp_audio,
        config.upload_dir(),
        &audio_name,
        config.max_name_attempts(),
    )
    .await
    .map_err(IntoAppError::into_app_error)?;
    guard.track_file(audio_path.clone());

    let audio_id = upload_from_disk(
        state,
        store,
        &audio_name,
        ingested.folder_id.as_deref(),
        &audio_path,
    )
    .await?;
    guard.track_remote(audio_id.clone());

    tracing::info!(
        video = %ingested.file_name,
        audio = %audio_disk_name,
        audio_remote_id = %audio_id,
        "Derived audio stored"
    );

    Ok(UploadResponse {
        video_file_id: Some(primary_id),
        video_file_url: Some(primary_url),
        audio_file_id: Some(audio_id),
        audio_file_url: Some(public_file_url(
            config.public_base_url(),
            origin,
            &audio_disk_name,
        )),
    })
}
