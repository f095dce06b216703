//! Error types module
//!
//! All failures that can end a request are unified under [`AppError`]. Each
//! variant self-describes how it is presented over HTTP through the
//! [`ErrorMetadata`] trait, so handlers only decide *which* error happened.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for client-caused failures worth noticing
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UNSUPPORTED_MEDIA")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The outbound fetch guard refused the URL. The payload is the internal
    /// rejection reason; clients only ever see "URL not allowed".
    #[error("URL not allowed: {0}")]
    UrlNotAllowed(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Name conflict: {0}")]
    NameConflict(String),

    /// A remote URL could not be fetched (transport error, timeout, non-200).
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The remote storage backend failed or timed out.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{tool} failed: {diagnostics}")]
    ExternalToolFailure { tool: String, diagnostics: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::UrlNotAllowed(_) => (
            400,
            "URL_NOT_ALLOWED",
            false,
            Some("Use a public http or https URL"),
            true,
            LogLevel::Warn,
        ),
        AppError::UnsupportedMedia(_) => (
            400,
            "UNSUPPORTED_MEDIA",
            false,
            Some("Upload an audio or video file"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the file name exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the bearer token"),
            false,
            LogLevel::Debug,
        ),
        AppError::NameConflict(_) => (
            409,
            "NAME_CONFLICT",
            false,
            Some("Choose a different file name"),
            false,
            LogLevel::Warn,
        ),
        AppError::UpstreamUnavailable(_) => (
            502,
            "UPSTREAM_UNAVAILABLE",
            false,
            Some("Check that the URL is reachable and returns 200"),
            false,
            LogLevel::Warn,
        ),
        AppError::Storage(_) => (
            502,
            "STORAGE_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::ExternalToolFailure { .. } => (
            500,
            "EXTERNAL_TOOL_FAILURE",
            false,
            Some("Check that the file contains an audio track"),
            false,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::UrlNotAllowed(_) => "UrlNotAllowed",
            AppError::UnsupportedMedia(_) => "UnsupportedMedia",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::NotFound(_) => "NotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::NameConflict(_) => "NameConflict",
            AppError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            AppError::Storage(_) => "Storage",
            AppError::ExternalToolFailure { .. } => "ExternalToolFailure",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::UrlNotAllowed(_) => "URL not allowed".to_string(),
            AppError::UnsupportedMedia(ref mime) => format!("Unsupported media type: {}", mime),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::NameConflict(ref msg) => msg.clone(),
            AppError::UpstreamUnavailable(ref msg) => format!("Failed to fetch URL: {}", msg),
            AppError::Storage(_) => "Failed to upload to remote storage".to_string(),
            AppError::ExternalToolFailure { ref tool, .. } => {
                format!("Audio extraction failed ({})", tool)
            }
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
