//! Render CLI progress parsing.
//!
//! The render engine reports frame counts on its output as
//! `Rendered 120/300` while drawing frames and `Encoded 120/300` while
//! stitching them. Rendering maps to the first 80% of the job, encoding to
//! the rest.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static PROGRESS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Rendered|Encoded)\s+(\d+)\s*/\s*(\d+)").unwrap());

const RENDER_SHARE: f64 = 0.8;

/// Phase reported by the render CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStage {
    Rendering,
    Encoding,
}

/// One progress report from the render CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderProgress {
    pub stage: RenderStage,
    pub done: u64,
    pub total: u64,
}

impl RenderProgress {
    /// Fraction of the stage completed.
    pub fn stage_fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.done as f64 / self.total as f64).min(1.0)
    }

    /// Whole-job percentage (0-100).
    pub fn percentage(&self) -> u8 {
        let fraction = match self.stage {
            RenderStage::Rendering => self.stage_fraction() * RENDER_SHARE,
            RenderStage::Encoding => RENDER_SHARE + self.stage_fraction() * (1.0 - RENDER_SHARE),
        };
        (fraction * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Parse a line of render CLI output.
pub fn parse_progress_line(line: &str) -> Option<RenderProgress> {
    let caps = PROGRESS_LINE.captures(line)?;
    let stage = match &caps[1] {
        "Rendered" => RenderStage::Rendering,
        _ => RenderStage::Encoding,
    };
    Some(RenderProgress {
        stage,
        done: caps[2].parse().ok()?,
        total: caps[3].parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rendered_and_encoded() {
        let p = parse_progress_line("Rendered 150/300, time remaining: 12s").unwrap();
        assert_eq!(p.stage, RenderStage::Rendering);
        assert_eq!(p.percentage(), 40);

        let p = parse_progress_line("\x1b[32mEncoded 300/300\x1b[0m").unwrap();
        assert_eq!(p.stage, RenderStage::Encoding);
        assert_eq!(p.percentage(), 100);
    }

    #[test]
    fn test_unrelated_lines_ignored() {
        assert!(parse_progress_line("Bundling 45%").is_none());
        assert!(parse_progress_line("+ S3 https://bucket/out.mp4").is_none());
    }

    #[test]
    fn test_zero_total() {
        let p = parse_progress_line("Rendered 0/0").unwrap();
        assert_eq!(p.percentage(), 0);
    }
}
