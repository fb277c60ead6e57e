//! Render job definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Render job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue
    #[default]
    Pending,
    /// Holding the render lock
    Processing,
    /// Render finished and the result is available
    Completed,
    /// Render failed; the error is recorded on the job
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure classification recorded on a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    /// Request rejected before it was queued
    Validation,
    /// The render invocation could not be started
    Submission,
    /// Subprocess or polling ceiling exceeded
    Timeout,
    /// Artifact not available yet
    TransientFetch,
    /// Artifact empty or unfetchable after retries
    PermanentFetch,
    /// External render concurrency exceeded
    RateLimit,
    /// Cancelled locally
    Cancelled,
    /// Anything else
    Internal,
}

impl JobErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobErrorKind::Validation => "validation",
            JobErrorKind::Submission => "submission",
            JobErrorKind::Timeout => "timeout",
            JobErrorKind::TransientFetch => "transient_fetch",
            JobErrorKind::PermanentFetch => "permanent_fetch",
            JobErrorKind::RateLimit => "rate_limit",
            JobErrorKind::Cancelled => "cancelled",
            JobErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a finished render lives.
///
/// Remote renders produce a cloud URL, local renders keep the artifact in
/// memory. Bytes are never serialized; only their size is reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobResult {
    Url {
        url: String,
    },
    Bytes {
        #[serde(skip)]
        data: Vec<u8>,
        size: usize,
    },
}

impl JobResult {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }

    pub fn bytes(data: Vec<u8>) -> Self {
        let size = data.len();
        Self::Bytes { data, size }
    }
}

/// A unit of render work and its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    /// Unique job ID
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Result reference once completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    /// Error message if the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error classification if the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<JobErrorKind>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Opaque render spec payload
    #[serde(skip_serializing, default)]
    #[schemars(skip)]
    pub render_spec: serde_json::Value,
}

impl RenderJob {
    /// Create a pending job for a render spec payload.
    pub fn new(render_spec: serde_json::Value) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            error_kind: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            render_spec,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to processing.
    pub fn start(&mut self) {
        self.status = JobStatus::Processing;
        self.progress = 0;
        self.started_at = Some(Utc::now());
    }

    /// Update progress, never moving backwards.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    /// Mark job as completed.
    pub fn complete(&mut self, result: JobResult) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.result = Some(result);
        self.error = None;
        self.error_kind = None;
        self.completed_at = Some(Utc::now());
    }

    /// Mark job as failed with an error message.
    pub fn fail(&mut self, kind: JobErrorKind, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.error_kind = Some(kind);
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_transitions() {
        let mut job = RenderJob::new(serde_json::json!({}));
        assert_eq!(job.status, JobStatus::Pending);
        assert!(!job.is_terminal());

        job.start();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.started_at.is_some());

        job.set_progress(40);
        job.set_progress(20);
        assert_eq!(job.progress, 40);

        job.complete(JobResult::url("https://example.com/out.mp4"));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_failed_job_records_kind() {
        let mut job = RenderJob::new(serde_json::json!({}));
        job.start();
        job.fail(JobErrorKind::Timeout, "Render timed out");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_kind, Some(JobErrorKind::Timeout));
        assert_eq!(job.error.as_deref(), Some("Render timed out"));
    }

    #[test]
    fn test_bytes_result_not_serialized() {
        let result = JobResult::bytes(vec![1, 2, 3]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "bytes");
        assert_eq!(json["size"], 3);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_job_serializes_camel_case_without_payload() {
        let job = RenderJob::new(serde_json::json!({"secret": true}));
        let json = serde_json::to_value(&job).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("renderSpec").is_none());
        assert_eq!(json["status"], "pending");
    }
}
