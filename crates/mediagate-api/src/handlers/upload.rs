//! `POST /upload`: streamed multipart upload.

use crate::error::HttpAppError;
use crate::middleware::RequestId;
use crate::services::{assemble, ingest_multipart, ArtifactGuard, UploadResponse};
use crate::state::AppState;
use crate::utils::RequestOrigin;
use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, Uri},
    Extension, Json,
};
use mediagate_storage::Credential;
use std::sync::Arc;

#[tracing::instrument(skip_all, fields(operation = "upload", request_id = %request_id.0.0))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<Credential>,
    request_id: Extension<RequestId>,
    headers: HeaderMap,
    uri: Uri,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let origin = RequestOrigin::from_request(&headers, &uri);
    let store = state.stores.store_for(&credential).await?;
    let mut guard = ArtifactGuard::new(store.clone(), state.config.storage_timeout());

    let ingested = ingest_multipart(&state.config, store.as_ref(), multipart, &mut guard).await?;
    let response = assemble(&state, store.as_ref(), ingested, &origin, &mut guard).await?;

    guard.commit();
    Ok(Json(response))
}
