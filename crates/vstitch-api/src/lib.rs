//! Axum HTTP API server.
//!
//! This crate provides:
//! - Sequence, single and merge video endpoints streaming the result back
//! - FFmpeg version probe and health endpoint
//! - Request IDs, CORS, body-size limit and request logging
//! - Prometheus metrics

pub mod config;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
