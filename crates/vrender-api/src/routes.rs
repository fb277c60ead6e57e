//! API routes.

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    delete_local_render, delete_render, download_local_render, download_render,
    get_local_render_status, get_render_status, health, preview_combinations, preview_progress,
    ready, submit_local_render, submit_render,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Serverless queue, single worker with cooldown
    let render_routes = Router::new()
        .route("/render", post(submit_render))
        .route("/render/:job_id", get(get_render_status).delete(delete_render))
        .route("/render/:job_id/download", put(download_render));

    // In-process renders through the local CLI
    let local_routes = Router::new()
        .route("/local/render", post(submit_local_render))
        .route(
            "/local/render/:job_id",
            get(get_local_render_status).delete(delete_local_render),
        )
        .route("/local/render/:job_id/download", put(download_local_render));

    let tool_routes = Router::new()
        .route("/variations/combinations", post(preview_combinations))
        .route("/progress/preview", post(preview_progress));

    let api_routes = Router::new()
        .merge(render_routes)
        .merge(local_routes)
        .merge(tool_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
