use vrender_models::ProgressBarConfig;

use super::{span_fraction, ProgressStrategy};

/// Relative speed of each phase after the fast start.
const PHASE_WEIGHTS: [f64; 7] = [2.0, 1.75, 1.5, 1.0, 0.75, 0.5, 0.25];

/// Phased formula used by the live overlay.
///
/// After the optional fast start, the remaining time is cut into seven
/// phases of equal duration. Each phase advances the bar in proportion to
/// its weight, so the bar decelerates towards the end. Fast-end settings
/// are not used here.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewProgress;

impl ProgressStrategy for PreviewProgress {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn progress(&self, elapsed_ms: f64, total_ms: f64, config: &ProgressBarConfig) -> f64 {
        if total_ms <= 0.0 {
            return 1.0;
        }
        let t = elapsed_ms.clamp(0.0, total_ms);
        if t >= total_ms {
            return 1.0;
        }
        if !config.use_deceptive_progress {
            return t / total_ms;
        }

        let (start_end, start_progress) = if config.fast_start_enabled() {
            (
                (config.fast_start_duration as f64).min(total_ms),
                config.fast_start_progress,
            )
        } else {
            (0.0, 0.0)
        };
        if t <= start_end && start_end > 0.0 {
            return start_progress * span_fraction(t, 0.0, start_end);
        }

        let remaining = total_ms - start_end;
        if remaining <= 0.0 {
            return 1.0;
        }
        let phase_len = remaining / PHASE_WEIGHTS.len() as f64;
        let weight_sum: f64 = PHASE_WEIGHTS.iter().sum();
        let span = 1.0 - start_progress;

        let mut fraction = start_progress;
        let mut phase_start = start_end;
        for weight in PHASE_WEIGHTS {
            let share = span * weight / weight_sum;
            let phase_end = phase_start + phase_len;
            if t < phase_end {
                fraction += share * span_fraction(t, phase_start, phase_end);
                return fraction.clamp(0.0, 1.0);
            }
            fraction += share;
            phase_start = phase_end;
        }
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deceptive(fast_start_duration: u64, fast_start_progress: f64) -> ProgressBarConfig {
        ProgressBarConfig {
            use_deceptive_progress: true,
            fast_start_duration,
            fast_start_progress,
            ..Default::default()
        }
    }

    #[test]
    fn test_bounds_and_monotone() {
        let config = deceptive(1500, 0.25);
        assert_eq!(PreviewProgress.progress(0.0, 10_000.0, &config), 0.0);
        assert_eq!(PreviewProgress.progress(10_000.0, 10_000.0, &config), 1.0);

        let mut last = 0.0;
        for i in 0..=500 {
            let value = PreviewProgress.progress(10_000.0 * i as f64 / 500.0, 10_000.0, &config);
            assert!(value >= last);
            last = value;
        }
    }

    #[test]
    fn test_first_phase_gets_weighted_share() {
        // No fast start: 7000 ms gives 1000 ms phases.
        let config = deceptive(0, 0.0);
        let after_first = PreviewProgress.progress(1000.0, 7000.0, &config);
        assert!((after_first - 2.0 / 7.75).abs() < 1e-9);

        let after_last = PreviewProgress.progress(6000.0, 7000.0, &config);
        assert!((after_last - 7.5 / 7.75).abs() < 1e-9);
    }

    #[test]
    fn test_fast_start_then_phases() {
        let config = deceptive(3000, 0.3);
        assert!((PreviewProgress.progress(3000.0, 10_000.0, &config) - 0.3).abs() < 1e-9);
        // First of seven 1000 ms phases adds 0.7 * 2 / 7.75.
        let expected = 0.3 + 0.7 * 2.0 / 7.75;
        assert!((PreviewProgress.progress(4000.0, 10_000.0, &config) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_no_forced_completion() {
        let config = deceptive(0, 0.0);
        assert!(PreviewProgress.progress(9950.0, 10_000.0, &config) < 1.0);
    }

    #[test]
    fn test_linear_without_deception() {
        let config = ProgressBarConfig::default();
        assert!((PreviewProgress.progress(2500.0, 10_000.0, &config) - 0.25).abs() < 1e-9);
    }
}
