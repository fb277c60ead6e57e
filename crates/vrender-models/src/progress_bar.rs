//! Progress bar overlay configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Visual and timing configuration of the progress overlay.
///
/// Durations are milliseconds, progress values are fractions in `[0, 1]`.
/// A phase is enabled when its duration is positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressBarConfig {
    pub visible: bool,
    pub background_color: String,
    pub foreground_color: String,
    /// Bar thickness in pixels
    pub height: u32,
    pub corner_radius: u32,
    /// Distance from the bottom edge in pixels
    pub bottom_offset: u32,
    pub use_deceptive_progress: bool,
    pub fast_start_duration: u64,
    pub fast_start_progress: f64,
    pub fast_end_duration: u64,
    pub fast_end_progress: f64,
}

impl Default for ProgressBarConfig {
    fn default() -> Self {
        Self {
            visible: true,
            background_color: "rgba(255, 255, 255, 0.3)".to_string(),
            foreground_color: "#ff0050".to_string(),
            height: 12,
            corner_radius: 6,
            bottom_offset: 0,
            use_deceptive_progress: false,
            fast_start_duration: 0,
            fast_start_progress: 0.0,
            fast_end_duration: 0,
            fast_end_progress: 0.0,
        }
    }
}

impl ProgressBarConfig {
    pub fn fast_start_enabled(&self) -> bool {
        self.use_deceptive_progress && self.fast_start_duration > 0
    }

    pub fn fast_end_enabled(&self) -> bool {
        self.use_deceptive_progress && self.fast_end_duration > 0
    }

    /// Reject configurations whose phases cannot be ordered.
    pub fn validate(&self) -> ValidationResult<()> {
        for (field, value) in [
            ("fastStartProgress", self.fast_start_progress),
            ("fastEndProgress", self.fast_end_progress),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::invalid_field(
                    field,
                    format!("must be within [0, 1], got {}", value),
                ));
            }
        }
        if self.fast_start_enabled()
            && self.fast_end_enabled()
            && self.fast_start_progress >= self.fast_end_progress
        {
            return Err(ValidationError::ProgressPhasesOverlap {
                fast_start: self.fast_start_progress,
                fast_end: self.fast_end_progress,
            });
        }
        Ok(())
    }
}
