//! Filename sanitizing and collision-free naming inside the upload directory.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("file name is empty")]
    Empty,

    #[error("file name {0:?} is not a file name")]
    DotSegment(String),

    #[error("file name {0:?} contains a path separator")]
    Separator(String),

    #[error("file name contains a NUL byte")]
    Nul,
}

#[derive(Debug, Error)]
pub enum ReserveError {
    #[error("no free name for {name:?} after {attempts} attempts")]
    Exhausted { name: String, attempts: u32 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Turn a client-supplied name into a safe single path segment.
///
/// The input is trimmed. Empty names, `.`, `..`, names containing `/`, `\`
/// or NUL are rejected rather than rewritten.
pub fn sanitize(name: &str) -> Result<String, SanitizeError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SanitizeError::Empty);
    }
    if trimmed == "." || trimmed == ".." {
        return Err(SanitizeError::DotSegment(trimmed.to_string()));
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(SanitizeError::Separator(trimmed.to_string()));
    }
    if trimmed.contains('\0') {
        return Err(SanitizeError::Nul);
    }

    let segment = Path::new(trimmed)
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SanitizeError::DotSegment(trimmed.to_string()))?;
    Ok(segment.to_string())
}

/// Split `name` into stem and extension (with its dot). A leading dot does
/// not start an extension, so `.env` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) => name.split_at(idx),
    }
}

/// The `n`-th candidate for `name`: the name itself, then `stem-1.ext`,
/// `stem-2.ext`, ...
fn candidate(name: &str, n: u64) -> String {
    if n == 0 {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    format!("{}-{}{}", stem, n, ext)
}

/// Probe `dir` for the first free candidate of `safe_name`.
///
/// The probe is unbounded and only checks for existence, so two concurrent
/// callers may pick the same name. Writers that need exclusivity use
/// [`reserve_unique`].
pub async fn ensure_unique(dir: &Path, safe_name: &str) -> io::Result<String> {
    let mut n: u64 = 0;
    loop {
        let name = candidate(safe_name, n);
        if !fs::try_exists(dir.join(&name)).await? {
            return Ok(name);
        }
        n += 1;
    }
}

/// Atomically claim a free candidate of `safe_name` in `dir` by creating it.
///
/// Returns the claimed name, its path and the freshly created (empty) file.
/// Gives up with [`ReserveError::Exhausted`] after `max_attempts` candidates.
pub async fn reserve_unique(
    dir: &Path,
    safe_name: &str,
    max_attempts: u32,
) -> Result<(String, PathBuf, File), ReserveError> {
    for n in 0..u64::from(max_attempts) {
        let name = candidate(safe_name, n);
        let path = dir.join(&name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((name, path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(ReserveError::Io(e)),
        }
    }

    tracing::warn!(
        name = %safe_name,
        attempts = max_attempts,
        "Upload directory has no free name left"
    );
    Err(ReserveError::Exhausted {
        name: safe_name.to_string(),
        attempts: max_attempts,
    })
}
