//! Progress overlay calculators.
//!
//! Two strategies compute the displayed fraction from elapsed and total
//! time. [`BakedProgress`] is drawn into exported renders, [`PreviewProgress`]
//! drives the live overlay. They disagree on purpose and are kept apart.

mod baked;
mod preview;

pub use baked::BakedProgress;
pub use preview::PreviewProgress;

use serde::{Deserialize, Serialize};
use vrender_models::ProgressBarConfig;

/// Common interface of the progress formulas.
pub trait ProgressStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Displayed fraction in `[0, 1]` after `elapsed_ms` of `total_ms`.
    fn progress(&self, elapsed_ms: f64, total_ms: f64, config: &ProgressBarConfig) -> f64;
}

/// Strategy selector for callers that pick one by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStrategyKind {
    #[default]
    Baked,
    Preview,
}

impl ProgressStrategyKind {
    pub fn strategy(&self) -> &'static dyn ProgressStrategy {
        match self {
            ProgressStrategyKind::Baked => &BakedProgress,
            ProgressStrategyKind::Preview => &PreviewProgress,
        }
    }

    /// Evaluate the strategy, then recalibrate for playback speed.
    pub fn progress(
        &self,
        elapsed_ms: f64,
        total_ms: f64,
        config: &ProgressBarConfig,
        speed: f64,
    ) -> f64 {
        let fraction = self.strategy().progress(elapsed_ms, total_ms, config);
        apply_speed_multiplier(fraction, speed)
    }
}

/// Recalibrate a fraction for the playback speed of the video.
///
/// Faster playback scales by `speed * 0.7`, slower playback divides by
/// the speed floored at 0.3. The result never exceeds 1.
pub fn apply_speed_multiplier(fraction: f64, speed: f64) -> f64 {
    let adjusted = if speed > 1.0 {
        (fraction * speed * 0.7).min(1.0)
    } else if speed < 1.0 {
        fraction / speed.max(0.3)
    } else {
        fraction
    };
    adjusted.clamp(0.0, 1.0)
}

/// `(t - from) / (to - from)` clamped to `[0, 1]`; 1 for an empty span.
pub(crate) fn span_fraction(t: f64, from: f64, to: f64) -> f64 {
    if to <= from {
        return 1.0;
    }
    ((t - from) / (to - from)).clamp(0.0, 1.0)
}
