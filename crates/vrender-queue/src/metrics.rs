//! Render job metrics.
//!
//! Every series carries a `queue` label ("remote" or "local").

use metrics::{counter, gauge};
use vrender_models::JobErrorKind;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vrender_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vrender_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vrender_jobs_failed_total";
    pub const QUEUE_DEPTH: &str = "vrender_queue_depth";
    pub const JOBS_PROCESSING: &str = "vrender_jobs_processing";
    pub const DOWNLOADS_TOTAL: &str = "vrender_downloads_total";
}

pub fn record_submitted(queue: &'static str) {
    counter!(names::JOBS_SUBMITTED_TOTAL, "queue" => queue).increment(1);
}

pub fn record_completed(queue: &'static str) {
    counter!(names::JOBS_COMPLETED_TOTAL, "queue" => queue).increment(1);
}

pub fn record_failed(queue: &'static str, kind: JobErrorKind) {
    counter!(names::JOBS_FAILED_TOTAL, "queue" => queue, "kind" => kind.as_str()).increment(1);
}

pub fn set_queue_depth(queue: &'static str, depth: usize) {
    gauge!(names::QUEUE_DEPTH, "queue" => queue).set(depth as f64);
}

pub fn set_processing(queue: &'static str, processing: bool) {
    gauge!(names::JOBS_PROCESSING, "queue" => queue).set(if processing { 1.0 } else { 0.0 });
}

pub fn record_download(queue: &'static str, outcome: &'static str) {
    counter!(names::DOWNLOADS_TOTAL, "queue" => queue, "outcome" => outcome).increment(1);
}
