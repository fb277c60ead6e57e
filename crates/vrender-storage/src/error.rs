//! Storage error types.

use thiserror::Error;
use vrender_models::JobErrorKind;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object is empty: {0}")]
    Empty(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Fetch of {key} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        key: String,
        attempts: u32,
        #[source]
        source: Box<StorageError>,
    },

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Whether the object may simply not have propagated yet.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound(_)
                | StorageError::DownloadFailed(_)
                | StorageError::Empty(_)
                | StorageError::AwsSdk(_)
        )
    }

    /// Classification recorded on the job.
    pub fn kind(&self) -> JobErrorKind {
        match self {
            StorageError::ConfigError(_) => JobErrorKind::Internal,
            StorageError::InvalidKey(_) | StorageError::RetriesExhausted { .. } => {
                JobErrorKind::PermanentFetch
            }
            _ => JobErrorKind::TransientFetch,
        }
    }
}
