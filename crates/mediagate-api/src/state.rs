//! Application state shared by all handlers.

use crate::utils::UrlFetcher;
use mediagate_core::Config;
use mediagate_processing::AudioExtractor;
use mediagate_storage::StoreProvider;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    /// Turns the request's credential into a remote store.
    pub stores: Arc<dyn StoreProvider>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub fetcher: UrlFetcher,
}

impl AppState {
    pub fn new(
        config: Config,
        stores: Arc<dyn StoreProvider>,
        extractor: Arc<dyn AudioExtractor>,
    ) -> Self {
        let fetcher = UrlFetcher::from_config(&config);
        Self {
            config,
            stores,
            extractor,
            fetcher,
        }
    }
}
