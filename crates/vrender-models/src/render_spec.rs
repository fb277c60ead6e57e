//! Fully resolved render request.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::composition::{DisplayWindow, PlatformConfig, TextStyle, TrackItem, Transform};
use crate::error::{ValidationError, ValidationResult};
use crate::progress_bar::ProgressBarConfig;
use crate::variation::AxisSelection;

/// Hard ceiling on the rendered duration, in milliseconds.
pub const MAX_RENDER_DURATION_MS: u64 = 300_000;

/// Which combination a render spec was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariationSummary {
    /// Output file name
    pub name: String,
    pub is_original: bool,
    pub selections: Vec<AxisSelection>,
    /// `{label}-{axis}` parts in naming order
    #[serde(default)]
    pub naming_parts: Vec<String>,
}

/// A text overlay with its resolved content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlay {
    pub id: String,
    pub text: String,
    pub display: DisplayWindow,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub style: TextStyle,
}

/// Record of a duration that exceeded the render ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DurationClamp {
    pub requested_ms: u64,
    pub clamped_ms: u64,
}

/// Everything the render engine needs, with no references left to resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderSpec {
    pub variation: VariationSummary,
    #[serde(default)]
    pub text_overlays: Vec<TextOverlay>,
    pub platform: PlatformConfig,
    /// Total render duration in milliseconds
    pub duration: u64,
    /// Video and image items
    #[serde(default)]
    pub video_track_items: Vec<TrackItem>,
    #[serde(default)]
    pub audio_track_items: Vec<TrackItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_bar: Option<ProgressBarConfig>,
    /// Playback speed applied to every video item
    #[serde(default = "default_speed")]
    pub speed_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_clamp: Option<DurationClamp>,
}

fn default_speed() -> f64 {
    1.0
}

/// Cap a requested duration at [`MAX_RENDER_DURATION_MS`].
///
/// Durations over the ceiling are never rejected; the returned record
/// carries the original request.
pub fn clamp_duration(requested: u64) -> (u64, Option<DurationClamp>) {
    if requested <= MAX_RENDER_DURATION_MS {
        return (requested, None);
    }
    (
        MAX_RENDER_DURATION_MS,
        Some(DurationClamp {
            requested_ms: requested,
            clamped_ms: MAX_RENDER_DURATION_MS,
        }),
    )
}

impl RenderSpec {
    /// Clamp `duration` to the render ceiling, recording the clamp.
    ///
    /// Returns the new clamp record, or `None` when the duration was
    /// already within bounds. An earlier record is kept in that case.
    pub fn clamp_to_ceiling(&mut self) -> Option<DurationClamp> {
        let (duration, clamp) = clamp_duration(self.duration);
        if let Some(clamp) = clamp {
            self.duration = duration;
            self.duration_clamp = Some(clamp);
        }
        clamp
    }

    /// Checks run synchronously at submission.
    pub fn validate(&self) -> ValidationResult<()> {
        self.platform.validate()?;
        if self.duration == 0 {
            return Err(ValidationError::invalid_field(
                "duration",
                "render duration must be positive",
            ));
        }
        if !(self.speed_factor.is_finite() && self.speed_factor > 0.0) {
            return Err(ValidationError::invalid_field(
                "speedFactor",
                format!("must be positive, got {}", self.speed_factor),
            ));
        }
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.validate()?;
        }
        Ok(())
    }
}
