//! `POST /upload-url`: fetch a remote file through the SSRF guard and ingest it.

use crate::error::HttpAppError;
use crate::middleware::RequestId;
use crate::services::ingest::sanitize_preferred;
use crate::services::{assemble, ingest_url, ArtifactGuard, UploadResponse};
use crate::state::AppState;
use crate::utils::RequestOrigin;
use axum::{
    extract::{rejection::FormRejection, State},
    http::{HeaderMap, Uri},
    Extension, Form, Json,
};
use mediagate_core::AppError;
use mediagate_storage::Credential;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UploadUrlForm {
    pub url: Option<String>,
    pub folder_id: Option<String>,
    pub file_name: Option<String>,
}

#[tracing::instrument(skip_all, fields(operation = "upload_url", request_id = %request_id.0.0))]
pub async fn upload_url(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<Credential>,
    request_id: Extension<RequestId>,
    headers: HeaderMap,
    uri: Uri,
    form: Result<Form<UploadUrlForm>, FormRejection>,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let Form(form) = form
        .map_err(|e| AppError::InvalidInput(format!("Invalid form body: {}", e.body_text())))?;

    let url = form
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::InvalidInput("No URL provided".to_string()))?
        .to_string();
    let preferred = sanitize_preferred(form.file_name)?;
    let folder_id = form
        .folder_id
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());

    let origin = RequestOrigin::from_request(&headers, &uri);
    let store = state.stores.store_for(&credential).await?;
    let mut guard = ArtifactGuard::new(store.clone(), state.config.storage_timeout());

    let ingested = ingest_url(
        &state.config,
        &state.fetcher,
        &url,
        folder_id,
        preferred,
        &mut guard,
    )
    .await?;
    let response = assemble(&state, store.as_ref(), ingested, &origin, &mut guard).await?;

    guard.commit();
    Ok(Json(response))
}
