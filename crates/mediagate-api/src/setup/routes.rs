//! Route configuration and setup

use crate::error::hide_error_details;
use crate::handlers;
use crate::middleware::{auth_middleware, request_id_middleware, AuthState};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use mediagate_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    hide_error_details(config.is_production());
    let auth_state = Arc::new(AuthState::from_config(config));

    tracing::info!(auth_mode = %config.auth_mode(), "Upload routes require a credential");

    let protected_routes = Router::new()
        .route("/upload", post(handlers::upload))
        .route("/upload-url", post(handlers::upload_url))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/uploads/{filename}", get(handlers::get_uploaded_file));

    let app = public_routes
        .merge(protected_routes)
        // Multipart bodies are streamed, so the only cap is the request
        // body limit below.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_size_bytes()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {:?}: {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new().allow_origin(origins)
    };

    Ok(cors
        .allow_methods(methods)
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION, header::CONTENT_LENGTH]))
}
