//! Render engine wrapper and progress overlay math.
//!
//! This crate provides:
//! - Type-safe render CLI command building
//! - A subprocess runner with timeout, cancellation and captured output
//! - `Rendered N/M` / `Encoded N/M` progress parsing
//! - Scoped scratch files for props and output artifacts
//! - The baked and preview progress overlay strategies

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod overlay;
pub mod progress;

pub use command::{check_render_cli, RenderCommand, RenderOutput, RenderRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::RenderScratch;
pub use overlay::{
    apply_speed_multiplier, BakedProgress, PreviewProgress, ProgressStrategy,
    ProgressStrategyKind,
};
pub use progress::{parse_progress_line, RenderProgress, RenderStage};
