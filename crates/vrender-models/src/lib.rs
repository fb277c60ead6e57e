//! Shared data models for the variation render orchestrator.
//!
//! This crate provides Serde-serializable types for:
//! - Render jobs and their lifecycle
//! - Variation axes, elements and combinations
//! - Compositions (track items, display windows, transforms)
//! - Progress bar configuration
//! - Fully resolved render specs
//! - Client-side download items

pub mod composition;
pub mod download;
pub mod error;
pub mod job;
pub mod progress_bar;
pub mod render_spec;
pub mod variation;

// Re-export common types
pub use composition::{
    CompositionSpec, DisplayWindow, ItemDetails, PlatformConfig, TextStyle, TrackItem,
    TrackItemKind, Transform,
};
pub use download::{DownloadId, DownloadItem, DownloadKind, DownloadStatus};
pub use error::{ValidationError, ValidationResult};
pub use job::{JobErrorKind, JobId, JobResult, JobStatus, RenderJob};
pub use progress_bar::ProgressBarConfig;
pub use render_spec::{
    clamp_duration, DurationClamp, RenderSpec, TextOverlay, VariationSummary, MAX_RENDER_DURATION_MS,
};
pub use variation::{
    Alternative, AxisKind, AxisSelection, VariationCombination, VariationElement, VariationSet,
    VariationValue,
};
