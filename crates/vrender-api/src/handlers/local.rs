//! In-process render handlers.
//!
//! Same shapes as the remote routes, served by the local worker.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use tracing::info;
use vrender_models::{JobId, RenderJob, RenderSpec};

use crate::error::{ApiError, ApiResult};
use crate::handlers::render::{download_response, SubmitResponse};
use crate::state::AppState;

pub async fn submit_local_render(
    State(state): State<AppState>,
    Json(spec): Json<RenderSpec>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let name = spec.variation.name.clone();
    let job_id = state.local.submit(spec)?;
    info!(job_id = %job_id, name = %name, "Local render accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse::pending(job_id, "/api/local/render")),
    ))
}

pub async fn get_local_render_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<RenderJob>> {
    state
        .local
        .status(&JobId::from_string(job_id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

pub async fn download_local_render(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let outcome = state.local.download(&JobId::from_string(job_id))?;
    download_response(outcome)
}

pub async fn delete_local_render(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .local
        .remove(&JobId::from_string(job_id))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}
