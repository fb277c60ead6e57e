//! Worker error types.

use thiserror::Error;
use vrender_media::MediaError;
use vrender_models::{JobErrorKind, ValidationError};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Worker is shut down")]
    ShutDown,

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classification recorded on the job.
    pub fn kind(&self) -> JobErrorKind {
        match self {
            WorkerError::Validation(_) => JobErrorKind::Validation,
            WorkerError::Media(e) => e.kind(),
            _ => JobErrorKind::Internal,
        }
    }
}
