//! mediagate storage library
//!
//! The remote-storage collaborator of the ingestion pipeline: "store bytes
//! under a name in a target folder, return an identifier". Backends implement
//! [`RemoteStore`]; the API layer obtains a store per request through a
//! [`StoreProvider`], which is where the caller's [`Credential`] is consumed.
//!
//! # Object key format
//!
//! Object-store backends key uploads as `{folder}/{uuid}-{name}`, with
//! `media` as the folder when none is given. The key doubles as the remote
//! identifier. Key generation is centralized in the `keys` module.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod provider;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_store;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use mediagate_core::StorageBackend;
pub use provider::{Credential, StaticStoreProvider, StoreProvider};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{RemoteStore, StorageError, StorageResult, UploadReader};
