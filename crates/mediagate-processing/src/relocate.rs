//! Moving generated files into the upload directory.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tokio::fs;

use crate::filename::{reserve_unique, sanitize, ReserveError, SanitizeError};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("invalid target name: {0}")]
    Sanitize(#[from] SanitizeError),

    #[error("could not reserve target name: {0}")]
    Reserve(#[from] ReserveError),

    #[error("failed to move file into place: {0}")]
    Io(#[from] io::Error),
}

/// Move `from` to `to`, copying and deleting when a rename is not possible
/// (temp dir on another filesystem).
pub async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(
                from = %from.display(),
                to = %to.display(),
                error = %rename_err,
                "Rename failed, falling back to copy"
            );
            if let Err(e) = fs::copy(from, to).await {
                let _ = fs::remove_file(to).await;
                return Err(e);
            }
            fs::remove_file(from).await
        }
    }
}

/// Persist a generated temp file into `dir` under a sanitized, unique
/// variant of `desired`.
///
/// The target name is claimed first, then the temp file is moved over the
/// placeholder. On failure the placeholder is removed and the temp file is
/// deleted when `temp` drops.
pub async fn persist_generated(
    temp: TempPath,
    dir: &Path,
    desired: &str,
    max_attempts: u32,
) -> Result<(String, PathBuf), PersistError> {
    let safe = sanitize(desired)?;
    let (name, path, placeholder) = reserve_unique(dir, &safe, max_attempts).await?;
    drop(placeholder);

    if let Err(e) = move_file(&temp, &path).await {
        let _ = fs::remove_file(&path).await;
        return Err(e.into());
    }

    Ok((name, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_with(dir: &Path, contents: &[u8]) -> TempPath {
        let file = tempfile::Builder::new()
            .suffix(".mp3")
            .tempfile_in(dir)
            .unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file.into_temp_path()
    }

    #[tokio::test]
    async fn persist_moves_into_unique_name() {
        let scratch = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        tokio::fs::write(uploads.path().join("clip-audio.mp3"), b"older")
            .await
            .unwrap();

        let temp = temp_with(scratch.path(), b"fresh");
        let temp_location = temp.to_path_buf();
        let (name, path) = persist_generated(temp, uploads.path(), "clip-audio.mp3", 10)
            .await
            .unwrap();

        assert_eq!(name, "clip-audio-1.mp3");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"fresh");
        assert_eq!(
            tokio::fs::read(uploads.path().join("clip-audio.mp3")).await.unwrap(),
            b"older"
        );
        assert!(!temp_location.exists());
    }

    #[tokio::test]
    async fn persist_rejects_unsafe_names_and_drops_temp() {
        let scratch = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();

        let temp = temp_with(scratch.path(), b"x");
        let err = persist_generated(temp, uploads.path(), "../escape.mp3", 10)
            .await
            .unwrap_err();

        assert!(matches!(err, PersistError::Sanitize(_)));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn move_file_replaces_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.bin");
        let to = dir.path().join("b.bin");
        tokio::fs::write(&from, b"payload").await.unwrap();
        tokio::fs::write(&to, b"").await.unwrap();

        move_file(&from, &to).await.unwrap();

        assert!(!from.exists());
        assert_eq!(tokio::fs::read(&to).await.unwrap(), b"payload");
    }
}
