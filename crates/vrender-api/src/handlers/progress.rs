//! Live progress overlay evaluation.

use axum::Json;
use serde::{Deserialize, Serialize};
use vrender_media::ProgressStrategyKind;
use vrender_models::ProgressBarConfig;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPreviewRequest {
    pub elapsed_ms: f64,
    pub total_ms: f64,
    #[serde(default)]
    pub config: ProgressBarConfig,
    #[serde(default = "preview_strategy")]
    pub strategy: ProgressStrategyKind,
    #[serde(default = "unit_speed")]
    pub speed: f64,
}

fn preview_strategy() -> ProgressStrategyKind {
    ProgressStrategyKind::Preview
}

fn unit_speed() -> f64 {
    1.0
}

#[derive(Debug, Serialize)]
pub struct ProgressPreviewResponse {
    pub fraction: f64,
    pub strategy: ProgressStrategyKind,
}

/// Displayed bar fraction at one instant of playback.
pub async fn preview_progress(
    Json(request): Json<ProgressPreviewRequest>,
) -> ApiResult<Json<ProgressPreviewResponse>> {
    for (field, value) in [
        ("elapsedMs", request.elapsed_ms),
        ("totalMs", request.total_ms),
        ("speed", request.speed),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ApiError::bad_request(format!(
                "{} must be a non-negative number",
                field
            )));
        }
    }

    let fraction = request.strategy.progress(
        request.elapsed_ms,
        request.total_ms,
        &request.config,
        request.speed,
    );
    Ok(Json(ProgressPreviewResponse {
        fraction,
        strategy: request.strategy,
    }))
}
