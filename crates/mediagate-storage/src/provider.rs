//! Credential seam between the HTTP layer and the remote store.

use crate::traits::{RemoteStore, StorageResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// The caller's authority to write to the remote store. Opaque to the
/// ingestion pipeline, which only hands it to a [`StoreProvider`].
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Per-request bearer token.
    Bearer(String),
    /// The long-lived service credential configured for the backend.
    Service,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Credential::Service => f.write_str("Service"),
        }
    }
}

/// Resolves a credential into a store that acts on the caller's behalf.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn store_for(&self, credential: &Credential) -> StorageResult<Arc<dyn RemoteStore>>;
}

/// Provider for backends that authenticate with their own service
/// credentials: every caller gets the same shared store. Bearer tokens have
/// already been checked by the HTTP layer at this point.
#[derive(Clone)]
pub struct StaticStoreProvider {
    store: Arc<dyn RemoteStore>,
}

impl StaticStoreProvider {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StoreProvider for StaticStoreProvider {
    async fn store_for(&self, credential: &Credential) -> StorageResult<Arc<dyn RemoteStore>> {
        tracing::debug!(
            credential = ?credential,
            backend = %self.store.backend_type(),
            "Resolved remote store"
        );
        Ok(self.store.clone())
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::{LocalStorage, StorageBackend};

    #[tokio::test]
    async fn static_provider_ignores_credential_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn RemoteStore> = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let provider = StaticStoreProvider::new(store);

        let a = provider
            .store_for(&Credential::Bearer("token".into()))
            .await
            .unwrap();
        let b = provider.store_for(&Credential::Service).await.unwrap();
        assert_eq!(a.backend_type(), StorageBackend::Local);
        assert_eq!(b.backend_type(), StorageBackend::Local);
    }

    #[test]
    fn debug_never_prints_tokens() {
        let rendered = format!("{:?}", Credential::Bearer("s3cr3t".into()));
        assert!(!rendered.contains("s3cr3t"));
    }
}
