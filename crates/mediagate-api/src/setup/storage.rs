//! Storage setup and initialization

use anyhow::Result;
use mediagate_core::Config;
use mediagate_storage::{create_store, StaticStoreProvider, StoreProvider};
use std::sync::Arc;

/// Build the remote store and wrap it in the provider handlers use.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn StoreProvider>> {
    tracing::info!("Initializing remote storage...");
    let store = create_store(config).await?;
    tracing::info!(
        backend = %store.backend_type(),
        "Remote storage initialized successfully"
    );

    Ok(Arc::new(StaticStoreProvider::new(store)))
}
