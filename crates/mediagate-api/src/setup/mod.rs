//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use mediagate_core::Config;
use mediagate_processing::FfmpegAudioExtractor;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    validation::validate_config(&config)
        .await
        .context("Configuration validation failed")?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let stores = storage::setup_storage(&config).await?;
    let extractor = Arc::new(FfmpegAudioExtractor::new(config.ffmpeg_path()));

    let state = Arc::new(AppState::new(config.clone(), stores, extractor));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
