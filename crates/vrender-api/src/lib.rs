//! Axum HTTP API server.
//!
//! This crate provides:
//! - Remote render submission, status and download over the render queue
//! - The same surface for the in-process local worker
//! - Combination preview and progress overlay evaluation
//! - Health/readiness probes and Prometheus metrics

pub mod config;
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
