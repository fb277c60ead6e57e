//! Queue error types.

use thiserror::Error;
use vrender_media::MediaError;
use vrender_models::{JobErrorKind, ValidationError};
use vrender_storage::StorageError;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Queue is shut down")]
    ShutDown,

    #[error("Render submission failed: {0}")]
    SubmissionFailed(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Render timed out: {0}")]
    Timeout(String),

    #[error("Object storage is not configured")]
    StorageNotConfigured,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Media(MediaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueueError {
    pub fn submission_failed(msg: impl Into<String>) -> Self {
        Self::SubmissionFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classification recorded on the job.
    pub fn kind(&self) -> JobErrorKind {
        match self {
            QueueError::Validation(_) => JobErrorKind::Validation,
            QueueError::SubmissionFailed(_) => JobErrorKind::Submission,
            QueueError::RateLimited(_) => JobErrorKind::RateLimit,
            QueueError::Timeout(_) => JobErrorKind::Timeout,
            QueueError::Storage(e) => e.kind(),
            QueueError::Media(e) => e.kind(),
            _ => JobErrorKind::Internal,
        }
    }
}

impl From<MediaError> for QueueError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::Timeout(limit) => QueueError::Timeout(format!("no result after {:?}", limit)),
            MediaError::RendererNotFound(_) => QueueError::SubmissionFailed(e.to_string()),
            other => QueueError::Media(other),
        }
    }
}
