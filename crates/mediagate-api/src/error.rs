//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Pipeline code
//! works with [`AppError`] and converts the errors of the lower crates with
//! [`IntoAppError`], so every failure renders through the same path.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mediagate_core::{AppError, ErrorMetadata, LogLevel};
use mediagate_processing::{ExtractError, PersistError, ReserveError, SanitizeError};
use mediagate_storage::StorageError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse (orphan rule).
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

/// Set once at startup from `Config::is_production`.
static HIDE_ERROR_DETAILS: AtomicBool = AtomicBool::new(false);

/// Stop including error details in responses. Called by route setup when
/// the configured environment is production.
pub fn hide_error_details(hide: bool) {
    HIDE_ERROR_DETAILS.store(hide, Ordering::Relaxed);
}

impl ErrorResponse {
    fn from_app_error(app_error: &AppError, with_details: bool) -> Self {
        Self {
            error: app_error.client_message(),
            details: with_details.then(|| app_error.detailed_message()),
            error_type: with_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        }
    }
}

fn render(app_error: &AppError, production: bool) -> Response {
    let status = StatusCode::from_u16(app_error.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    log_error(app_error);

    // Details never leave the process in production or for sensitive errors.
    let with_details = !production && !app_error.is_sensitive();
    let body = ErrorResponse::from_app_error(app_error, with_details);

    (status, Json(body)).into_response()
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        render(&self.0, HIDE_ERROR_DETAILS.load(Ordering::Relaxed))
    }
}

/// Conversion of the lower crates' errors into [`AppError`].
pub trait IntoAppError {
    fn into_app_error(self) -> AppError;
}

impl IntoAppError for StorageError {
    fn into_app_error(self) -> AppError {
        match self {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::UploadFailed(msg)
            | StorageError::DeleteFailed(msg)
            | StorageError::BackendError(msg) => AppError::Storage(msg),
            StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoAppError for SanitizeError {
    fn into_app_error(self) -> AppError {
        AppError::InvalidInput(format!("Invalid file name: {}", self))
    }
}

impl IntoAppError for ReserveError {
    fn into_app_error(self) -> AppError {
        match self {
            ReserveError::Exhausted { .. } => AppError::NameConflict(self.to_string()),
            ReserveError::Io(err) => AppError::Internal(format!("Failed to create file: {}", err)),
        }
    }
}

impl IntoAppError for PersistError {
    fn into_app_error(self) -> AppError {
        match self {
            PersistError::Sanitize(err) => err.into_app_error(),
            PersistError::Reserve(err) => err.into_app_error(),
            PersistError::Io(err) => {
                AppError::Internal(format!("Failed to move generated file: {}", err))
            }
        }
    }
}

impl IntoAppError for ExtractError {
    fn into_app_error(self) -> AppError {
        match self {
            ExtractError::TempFile(err) => {
                AppError::Internal(format!("Failed to create temporary file: {}", err))
            }
            ExtractError::Spawn { ref tool, .. } | ExtractError::Failed { ref tool, .. } => {
                AppError::ExternalToolFailure {
                    tool: tool.clone(),
                    diagnostics: self.diagnostics(),
                }
            }
        }
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(err.into_app_error())
    }
}

impl From<SanitizeError> for HttpAppError {
    fn from(err: SanitizeError) -> Self {
        HttpAppError(err.into_app_error())
    }
}
