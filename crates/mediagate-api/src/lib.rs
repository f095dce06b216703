//! mediagate API library
//!
//! HTTP surface of the ingestion pipeline: handlers, middleware, the outbound
//! fetch guard, the ingress pipeline and response assembler, and application
//! setup.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod utils;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
