//! `GET /uploads/{filename}`: serve a stored artifact.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use mediagate_core::AppError;
use mediagate_processing::{classify, sanitize};
use std::io;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

pub async fn get_uploaded_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, HttpAppError> {
    let name = sanitize(&filename)?;
    let path = state.config.upload_dir().join(&name);

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".to_string()).into())
        }
        Err(e) => return Err(AppError::from(e).into()),
    };
    let metadata = file.metadata().await.map_err(AppError::from)?;
    if !metadata.is_file() {
        return Err(AppError::NotFound("File not found".to_string()).into());
    }
    let content_type = classify(&path).await.map_err(AppError::from)?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, metadata.len().to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
