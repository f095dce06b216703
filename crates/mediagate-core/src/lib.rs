//! mediagate core library
//!
//! Configuration, the unified error taxonomy and the small enums shared by the
//! storage, processing and API crates.

pub mod config;
pub mod error;
pub mod storage_types;

pub use config::{AuthMode, BaseConfig, Config, LogFormat, MediaGateConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
