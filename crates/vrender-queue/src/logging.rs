//! Structured job logging.

use tracing::{error, info, warn, Span};
use vrender_models::JobId;

/// Logs render job lifecycle events with the job id and queue attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    queue: &'static str,
}

impl JobLogger {
    /// `queue` names the queue that owns the job ("remote", "local").
    pub fn new(job_id: &JobId, queue: &'static str) -> Self {
        Self {
            job_id: job_id.to_string(),
            queue,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, queue = self.queue, "Render started: {}", message);
    }

    pub fn log_progress(&self, progress: u8) {
        info!(job_id = %self.job_id, queue = self.queue, progress, "Render progress");
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, queue = self.queue, "Render warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, queue = self.queue, "Render failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, queue = self.queue, "Render completed: {}", message);
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span to instrument the job's work with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("render_job", job_id = %self.job_id, queue = self.queue)
    }
}
