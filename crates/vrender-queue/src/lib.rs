//! Remote render queue.
//!
//! This crate provides:
//! - A FIFO queue processed by a single worker behind a boolean lock
//! - The [`RenderBackend`] seam and the serverless CLI backend
//! - Result URL parsing and rate-limit detection on CLI output
//! - The explicit download step fetching artifacts from object storage
//! - Job logging and queue metrics shared with the local worker

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod queue;

pub use backend::{CliRenderBackend, ProgressSink, RenderBackend};
pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use logging::JobLogger;
pub use output::{is_rate_limited, parse_result_url, RATE_LIMIT_MESSAGE};
pub use queue::{DownloadOutcome, RenderQueue};
