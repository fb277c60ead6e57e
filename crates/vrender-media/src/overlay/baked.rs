use vrender_models::ProgressBarConfig;

use super::{span_fraction, ProgressStrategy};

/// Past this share of the total the bar is shown full.
const COMPLETION_THRESHOLD: f64 = 0.99;

/// Piecewise-linear formula baked into exported renders.
///
/// With deception off the bar is linear. A fast-start phase maps
/// `[0, fastStartDuration]` onto `[0, fastStartProgress]`, a fast-end phase
/// maps the last `fastEndDuration` onto `[fastEndProgress, 1]`, and the time
/// between the phases fills the rest linearly. Phases whose progress values
/// cross fall back to linear.
#[derive(Debug, Clone, Copy, Default)]
pub struct BakedProgress;

impl ProgressStrategy for BakedProgress {
    fn name(&self) -> &'static str {
        "baked"
    }

    fn progress(&self, elapsed_ms: f64, total_ms: f64, config: &ProgressBarConfig) -> f64 {
        if total_ms <= 0.0 {
            return 1.0;
        }
        let t = elapsed_ms.clamp(0.0, total_ms);
        if t >= total_ms * COMPLETION_THRESHOLD {
            return 1.0;
        }

        let linear = t / total_ms;
        let fraction = match (config.fast_start_enabled(), config.fast_end_enabled()) {
            (false, false) => linear,
            (true, false) => {
                let start_end = (config.fast_start_duration as f64).min(total_ms);
                let fsp = config.fast_start_progress;
                if t <= start_end {
                    fsp * span_fraction(t, 0.0, start_end)
                } else {
                    fsp + (1.0 - fsp) * span_fraction(t, start_end, total_ms)
                }
            }
            (false, true) => {
                let end_start = (total_ms - config.fast_end_duration as f64).max(0.0);
                let fep = config.fast_end_progress;
                if t < end_start {
                    fep * span_fraction(t, 0.0, end_start)
                } else {
                    fep + (1.0 - fep) * span_fraction(t, end_start, total_ms)
                }
            }
            (true, true) => {
                let fsp = config.fast_start_progress;
                let fep = config.fast_end_progress;
                if fsp >= fep {
                    linear
                } else {
                    let start_end = (config.fast_start_duration as f64).min(total_ms);
                    let end_start =
                        (total_ms - config.fast_end_duration as f64).max(start_end);
                    if t <= start_end {
                        fsp * span_fraction(t, 0.0, start_end)
                    } else if t < end_start {
                        fsp + (fep - fsp) * span_fraction(t, start_end, end_start)
                    } else {
                        fep + (1.0 - fep) * span_fraction(t, end_start, total_ms)
                    }
                }
            }
        };
        fraction.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(config: &ProgressBarConfig, total: f64, steps: usize) -> Vec<f64> {
        (0..=steps)
            .map(|i| BakedProgress.progress(total * i as f64 / steps as f64, total, config))
            .collect()
    }

    fn assert_monotone(values: &[f64]) {
        for pair in values.windows(2) {
            assert!(pair[1] >= pair[0], "{} then {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_linear_bounds_and_monotone() {
        let config = ProgressBarConfig::default();
        for total in [1.0, 999.0, 10_000.0, 300_000.0] {
            assert_eq!(BakedProgress.progress(0.0, total, &config), 0.0);
            assert_eq!(BakedProgress.progress(total, total, &config), 1.0);
            assert_monotone(&sample(&config, total, 200));
        }
        assert!((BakedProgress.progress(2500.0, 10_000.0, &config) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_fast_start_hits_target() {
        let config = ProgressBarConfig {
            use_deceptive_progress: true,
            fast_start_duration: 2000,
            fast_start_progress: 0.4,
            ..Default::default()
        };
        assert_eq!(BakedProgress.progress(2000.0, 10_000.0, &config), 0.4);
        assert!((BakedProgress.progress(1000.0, 10_000.0, &config) - 0.2).abs() < 1e-9);
        assert!((BakedProgress.progress(6000.0, 10_000.0, &config) - 0.7).abs() < 1e-9);
        assert_monotone(&sample(&config, 10_000.0, 200));
    }

    #[test]
    fn test_fast_end_window() {
        let config = ProgressBarConfig {
            use_deceptive_progress: true,
            fast_end_duration: 2000,
            fast_end_progress: 0.8,
            ..Default::default()
        };
        assert!((BakedProgress.progress(4000.0, 10_000.0, &config) - 0.4).abs() < 1e-9);
        assert!((BakedProgress.progress(8000.0, 10_000.0, &config) - 0.8).abs() < 1e-9);
        assert!((BakedProgress.progress(9000.0, 10_000.0, &config) - 0.9).abs() < 1e-9);
        assert_monotone(&sample(&config, 10_000.0, 200));
    }

    #[test]
    fn test_three_segments() {
        let config = ProgressBarConfig {
            use_deceptive_progress: true,
            fast_start_duration: 2000,
            fast_start_progress: 0.5,
            fast_end_duration: 2000,
            fast_end_progress: 0.7,
            ..Default::default()
        };
        assert_eq!(BakedProgress.progress(2000.0, 10_000.0, &config), 0.5);
        assert!((BakedProgress.progress(5000.0, 10_000.0, &config) - 0.6).abs() < 1e-9);
        assert!((BakedProgress.progress(8000.0, 10_000.0, &config) - 0.7).abs() < 1e-9);
        assert_monotone(&sample(&config, 10_000.0, 200));
    }

    #[test]
    fn test_crossed_phases_fall_back_to_linear() {
        let config = ProgressBarConfig {
            use_deceptive_progress: true,
            fast_start_duration: 3000,
            fast_start_progress: 0.6,
            fast_end_duration: 3000,
            fast_end_progress: 0.6,
            ..Default::default()
        };
        let linear = ProgressBarConfig::default();
        for i in 0..=100 {
            let t = 10_000.0 * i as f64 / 100.0;
            assert_eq!(
                BakedProgress.progress(t, 10_000.0, &config),
                BakedProgress.progress(t, 10_000.0, &linear)
            );
        }
    }

    #[test]
    fn test_forced_full_near_end() {
        let config = ProgressBarConfig::default();
        assert_eq!(BakedProgress.progress(9900.0, 10_000.0, &config), 1.0);
        assert!(BakedProgress.progress(9890.0, 10_000.0, &config) < 1.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        let config = ProgressBarConfig::default();
        assert_eq!(BakedProgress.progress(100.0, 0.0, &config), 1.0);
        assert_eq!(BakedProgress.progress(-50.0, 1000.0, &config), 0.0);
        assert_eq!(BakedProgress.progress(5000.0, 1000.0, &config), 1.0);
    }
}
