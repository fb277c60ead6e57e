//! Client-side download queue items.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::job::JobId;

/// Unique identifier for a download item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DownloadId(pub String);

impl DownloadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DownloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a download item does when started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DownloadKind {
    /// Submit a render spec to the remote queue, poll, then download
    Render,
    /// Fetch a plain URL
    Direct,
}

impl DownloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadKind::Render => "render",
            DownloadKind::Direct => "direct",
        }
    }
}

/// Client-side status, mirroring the remote job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    #[default]
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed)
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the persisted client queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadItem {
    pub id: DownloadId,
    /// Output file name
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DownloadKind,
    pub status: DownloadStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Remote job backing this item, once submitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Render spec payload for render items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_spec: Option<serde_json::Value>,
    /// Source URL for direct items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Where the finished file was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl DownloadItem {
    /// A render item carrying its render spec.
    pub fn render(name: impl Into<String>, render_spec: serde_json::Value) -> Self {
        Self::new(name, DownloadKind::Render, Some(render_spec), None)
    }

    /// A direct URL download.
    pub fn direct(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, DownloadKind::Direct, None, Some(url.into()))
    }

    fn new(
        name: impl Into<String>,
        kind: DownloadKind,
        render_spec: Option<serde_json::Value>,
        url: Option<String>,
    ) -> Self {
        Self {
            id: DownloadId::new(),
            name: name.into(),
            kind,
            status: DownloadStatus::Pending,
            progress: 0,
            job_id: None,
            render_spec,
            url,
            error: None,
            output_path: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        self.status = DownloadStatus::Downloading;
        self.error = None;
        self.started_at = Some(Utc::now());
    }

    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }

    pub fn complete(&mut self, output_path: impl Into<String>) {
        self.status = DownloadStatus::Completed;
        self.progress = 100;
        self.output_path = Some(output_path.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = DownloadStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Put a failed or interrupted item back in line.
    pub fn reset(&mut self) {
        self.status = DownloadStatus::Pending;
        self.progress = 0;
        self.error = None;
        self.started_at = None;
        self.completed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_lifecycle() {
        let mut item = DownloadItem::render("M-video.mp4", serde_json::json!({}));
        assert_eq!(item.status, DownloadStatus::Pending);

        item.start();
        assert_eq!(item.status, DownloadStatus::Downloading);

        item.complete("/tmp/M-video.mp4");
        assert!(item.status.is_terminal());
        assert_eq!(item.progress, 100);
    }

    #[test]
    fn test_persisted_shape() {
        let mut item = DownloadItem::direct("a.mp4", "https://cdn/a.mp4");
        item.job_id = Some(JobId::from_string("job-1"));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "direct");
        assert_eq!(json["jobId"], "job-1");

        let restored: DownloadItem = serde_json::from_value(json).unwrap();
        assert_eq!(restored, item);
    }
}
