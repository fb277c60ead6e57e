//! Remote render queue handlers.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::info;
use vrender_models::{JobId, JobStatus, RenderJob, RenderSpec};
use vrender_queue::DownloadOutcome;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of an accepted submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub polling_url: String,
    pub download_url: String,
}

impl SubmitResponse {
    pub(crate) fn pending(job_id: JobId, base: &str) -> Self {
        Self {
            polling_url: format!("{}/{}", base, job_id),
            download_url: format!("{}/{}/download", base, job_id),
            job_id,
            status: JobStatus::Pending,
        }
    }
}

/// Body of a download request that came too early.
#[derive(Debug, Serialize)]
pub struct NotReadyResponse {
    pub status: JobStatus,
    pub progress: u8,
}

/// Map a download outcome onto the HTTP contract.
///
/// 202 while rendering, the job's own error as a 500 once it failed,
/// the MP4 as an attachment when ready.
pub(crate) fn download_response(outcome: DownloadOutcome) -> ApiResult<Response> {
    match outcome {
        DownloadOutcome::NotReady { status, progress } => {
            Ok((StatusCode::ACCEPTED, Json(NotReadyResponse { status, progress })).into_response())
        }
        DownloadOutcome::Failed { error, kind } => Err(ApiError::RenderFailed {
            detail: error,
            kind,
        }),
        DownloadOutcome::Ready { file_name, data } => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "video/mp4".to_string()),
                (header::CONTENT_DISPOSITION, attachment(&file_name)),
            ],
            data,
        )
            .into_response()),
    }
}

/// `attachment` disposition with a header-safe file name.
fn attachment(file_name: &str) -> String {
    let name: String = file_name
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && *c != '"' && *c != '\\')
        .collect();
    let name = if name.trim().is_empty() {
        "video.mp4".to_string()
    } else {
        name
    };
    format!("attachment; filename=\"{}\"", name)
}

/// Enqueue a render on the remote queue.
pub async fn submit_render(
    State(state): State<AppState>,
    Json(spec): Json<RenderSpec>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let name = spec.variation.name.clone();
    let job_id = state.queue.submit(spec)?;
    info!(job_id = %job_id, name = %name, "Remote render accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse::pending(job_id, "/api/render")),
    ))
}

/// Current state of a remote job.
pub async fn get_render_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<RenderJob>> {
    state
        .queue
        .status(&JobId::from_string(job_id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

/// Fetch the artifact of a remote job; the job is deleted on success.
pub async fn download_render(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let outcome = state.queue.download(&JobId::from_string(job_id)).await?;
    download_response(outcome)
}

/// Forget a remote job. A job already dispatched keeps rendering remotely.
pub async fn delete_render(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .queue
        .remove(&JobId::from_string(job_id))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_strips_unsafe_characters() {
        assert_eq!(
            attachment("M-video.mp4"),
            r#"attachment; filename="M-video.mp4""#
        );
        assert_eq!(
            attachment("Ünïcode \"quoted\".mp4"),
            r#"attachment; filename="ncode quoted.mp4""#
        );
        assert_eq!(attachment("\"\""), r#"attachment; filename="video.mp4""#);
    }

    #[test]
    fn test_submit_response_urls() {
        let response = SubmitResponse::pending(JobId::from_string("job-1"), "/api/local/render");
        assert_eq!(response.polling_url, "/api/local/render/job-1");
        assert_eq!(response.download_url, "/api/local/render/job-1/download");
        assert_eq!(response.status, JobStatus::Pending);
    }
}
