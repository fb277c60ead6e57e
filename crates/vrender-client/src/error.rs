//! Client error types.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Render API returned {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Render timed out after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("cancelled")]
    Cancelled,

    #[error("Download item not found: {0}")]
    ItemNotFound(String),

    #[error("Invalid download item: {0}")]
    InvalidItem(String),

    #[error("Persistence error: {0}")]
    Persist(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    pub fn api(status: u16, detail: impl Into<String>) -> Self {
        Self::Api {
            status,
            detail: detail.into(),
        }
    }

    pub fn invalid_item(msg: impl Into<String>) -> Self {
        Self::InvalidItem(msg.into())
    }

    /// Whether another attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(e) => e.is_timeout() || e.is_connect(),
            ClientError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
