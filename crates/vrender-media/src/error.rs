//! Error types for render subprocess operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use vrender_models::JobErrorKind;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving the render engine.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Render CLI not found in PATH: {0}")]
    RendererNotFound(String),

    #[error("Render command failed: {message}")]
    RenderFailed {
        message: String,
        /// Captured stdout and stderr
        output: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Render output was not created: {0}")]
    OutputNotCreated(PathBuf),

    #[error("Render output is empty: {0}")]
    EmptyOutput(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Render timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a render failure error.
    pub fn render_failed(
        message: impl Into<String>,
        output: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::RenderFailed {
            message: message.into(),
            output,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Captured CLI output, when the failure carries one.
    pub fn output(&self) -> Option<&str> {
        match self {
            MediaError::RenderFailed { output, .. } => output.as_deref(),
            _ => None,
        }
    }

    /// Classification recorded on the job.
    pub fn kind(&self) -> JobErrorKind {
        match self {
            MediaError::RendererNotFound(_) | MediaError::RenderFailed { .. } => {
                JobErrorKind::Submission
            }
            MediaError::Timeout(_) => JobErrorKind::Timeout,
            MediaError::Cancelled => JobErrorKind::Cancelled,
            _ => JobErrorKind::Internal,
        }
    }
}
