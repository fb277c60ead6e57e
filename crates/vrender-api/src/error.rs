//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vrender_compose::ComposeError;
use vrender_models::JobErrorKind;
use vrender_queue::QueueError;
use vrender_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The job itself failed; the message is the one recorded on it
    #[error("{detail}")]
    RenderFailed {
        detail: String,
        kind: Option<JobErrorKind>,
    },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Compose(_) => StatusCode::BAD_REQUEST,
            ApiError::RenderFailed { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Queue(e) => match e {
                QueueError::Validation(_) => StatusCode::BAD_REQUEST,
                QueueError::JobNotFound(_) => StatusCode::NOT_FOUND,
                QueueError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
                QueueError::Storage(_) | QueueError::StorageNotConfigured => {
                    StatusCode::BAD_GATEWAY
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Worker(e) => match e {
                WorkerError::Validation(_) => StatusCode::BAD_REQUEST,
                WorkerError::JobNotFound(_) => StatusCode::NOT_FOUND,
                WorkerError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable code of the response body.
    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::NotFound(_) => Some("not_found"),
            ApiError::BadRequest(_) => Some("bad_request"),
            ApiError::RenderFailed { kind, .. } => {
                Some(kind.as_ref().map(JobErrorKind::as_str).unwrap_or("render_failed"))
            }
            ApiError::Unavailable(_) => Some("unavailable"),
            ApiError::Compose(ComposeError::TooManyCombinations { .. }) => {
                Some("too_many_combinations")
            }
            ApiError::Compose(_) => Some(JobErrorKind::Validation.as_str()),
            ApiError::Queue(e) => Some(e.kind().as_str()),
            ApiError::Worker(e) => Some(e.kind().as_str()),
            ApiError::Internal(_) => None,
        }
    }

    /// Whether the message may reveal server internals.
    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
            && !matches!(self, ApiError::RenderFailed { .. })
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if self.is_internal()
            && std::env::var("ENVIRONMENT")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false)
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}
