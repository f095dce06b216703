//! Rollback of partially created artifacts.

use mediagate_storage::RemoteStore;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Everything a request created so far: local files and remote objects.
///
/// Unless [`commit`](ArtifactGuard::commit) is called, dropping the guard
/// deletes the local files right away and schedules deletion of the remote
/// objects on the runtime. Dropping also happens when the client hangs up
/// and the handler future is cancelled.
pub struct ArtifactGuard {
    store: Arc<dyn RemoteStore>,
    delete_timeout: Duration,
    files: Vec<PathBuf>,
    remote_ids: Vec<String>,
    committed: bool,
}

impl ArtifactGuard {
    pub fn new(store: Arc<dyn RemoteStore>, delete_timeout: Duration) -> Self {
        Self {
            store,
            delete_timeout,
            files: Vec::new(),
            remote_ids: Vec::new(),
            committed: false,
        }
    }

    pub fn track_file(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    pub fn track_remote(&mut self, remote_id: String) {
        self.remote_ids.push(remote_id);
    }

    /// Keep everything; ownership of the files passes to the upload directory.
    pub fn commit(mut self) {
        self.committed = true;
    }

    fn rollback(&mut self) {
        for path in self.files.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed partial artifact"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove partial artifact"
                ),
            }
        }

        if self.remote_ids.is_empty() {
            return;
        }

        let remote_ids = std::mem::take(&mut self.remote_ids);
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(
                    remote_ids = ?remote_ids,
                    "No runtime available, remote objects left in place"
                );
                return;
            }
        };

        let store = self.store.clone();
        let limit = self.delete_timeout;
        handle.spawn(async move {
            for remote_id in remote_ids {
                match tokio::time::timeout(limit, store.delete(&remote_id)).await {
                    Ok(Ok(())) => {
                        tracing::info!(remote_id = %remote_id, "Deleted remote object after failure")
                    }
                    Ok(Err(e)) => tracing::warn!(
                        remote_id = %remote_id,
                        error = %e,
                        "Failed to delete remote object after failure"
                    ),
                    Err(_) => tracing::warn!(
                        remote_id = %remote_id,
                        "Timed out deleting remote object after failure"
                    ),
                }
            }
        });
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediagate_storage::LocalStorage;

    async fn local_store(dir: &std::path::Path) -> Arc<dyn RemoteStore> {
        Arc::new(LocalStorage::new(dir).await.unwrap())
    }

    #[tokio::test]
    async fn dropping_removes_files_and_remote_objects() {
        let uploads = tempfile::tempdir().unwrap();
        let remote_dir = tempfile::tempdir().unwrap();
        let store = local_store(remote_dir.path()).await;

        let local = uploads.path().join("clip.mp4");
        tokio::fs::write(&local, b"data").await.unwrap();
        let remote_id = store
            .upload("clip.mp4", None, Box::pin(&b"data"[..]))
            .await
            .unwrap();
        assert!(remote_dir.path().join(&remote_id).exists());

        let mut guard = ArtifactGuard::new(store, Duration::from_secs(5));
        guard.track_file(local.clone());
        guard.track_remote(remote_id.clone());
        drop(guard);

        assert!(!local.exists());
        for _ in 0..50 {
            if !remote_dir.path().join(&remote_id).exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("remote object was not deleted");
    }

    #[tokio::test]
    async fn commit_keeps_everything() {
        let uploads = tempfile::tempdir().unwrap();
        let store = local_store(uploads.path()).await;

        let local = uploads.path().join("song.mp3");
        tokio::fs::write(&local, b"data").await.unwrap();

        let mut guard = ArtifactGuard::new(store, Duration::from_secs(5));
        guard.track_file(local.clone());
        guard.commit();

        assert!(local.exists());
    }
}
