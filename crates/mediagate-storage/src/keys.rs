//! Shared key generation for object-store backends.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

/// Folder used when the request does not name one.
pub const DEFAULT_FOLDER: &str = "media";

/// Build the object key `{folder}/{uuid}-{name}`.
///
/// Folder ids may contain nested segments (`a/b`) but never `..`, a leading
/// `/` or backslashes; the name must be a single segment.
pub fn object_key(folder_id: Option<&str>, name: &str) -> StorageResult<String> {
    let folder = folder_id
        .map(|f| f.trim().trim_end_matches('/'))
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FOLDER);

    if folder.starts_with('/')
        || folder.contains('\\')
        || folder.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid folder id: {}",
            folder
        )));
    }

    if name.is_empty() || name.contains('/') || name.contains('\\') || name == "." || name == ".."
    {
        return Err(StorageError::InvalidKey(format!("Invalid object name: {}", name)));
    }

    Ok(format!("{}/{}-{}", folder, Uuid::new_v4(), name))
}
