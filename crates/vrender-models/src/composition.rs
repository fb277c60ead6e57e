//! Composition model: track items placed on a timeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::progress_bar::ProgressBarConfig;

/// Kind of a track item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrackItemKind {
    Video,
    Image,
    Audio,
    Text,
}

impl TrackItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackItemKind::Video => "video",
            TrackItemKind::Image => "image",
            TrackItemKind::Audio => "audio",
            TrackItemKind::Text => "text",
        }
    }
}

/// Half-open display window `[from, to)` in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DisplayWindow {
    pub from: u64,
    pub to: u64,
}

impl DisplayWindow {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    pub fn duration_ms(&self) -> u64 {
        self.to.saturating_sub(self.from)
    }

    /// Stretch the window for a playback rate below 1, keeping `from`.
    pub fn stretched(&self, rate: f64) -> Self {
        if !(rate > 0.0 && rate < 1.0) {
            return *self;
        }
        let extended = (self.duration_ms() as f64 / rate).round() as u64;
        Self {
            from: self.from,
            to: self.from + extended,
        }
    }
}

/// Spatial transform of an item on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transform {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_scale() -> f64 {
    1.0
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
            scale: default_scale(),
            rotation: 0.0,
            opacity: default_opacity(),
        }
    }
}

/// Text styling overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
}

/// Per-item content overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TextStyle>,
}

/// One item on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TrackItemKind,
    pub display: DisplayWindow,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub details: ItemDetails,
}

impl TrackItem {
    pub fn new(id: impl Into<String>, kind: TrackItemKind, display: DisplayWindow) -> Self {
        Self {
            id: id.into(),
            kind,
            display,
            transform: Transform::default(),
            details: ItemDetails::default(),
        }
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.details.src = Some(src.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.details.text = Some(text.into());
        self
    }

    pub fn playback_rate(&self) -> f64 {
        self.details.playback_rate.unwrap_or(1.0)
    }
}

/// Output canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            name: None,
            width: 1080,
            height: 1920,
            aspect_ratio: "9:16".to_string(),
        }
    }
}

impl PlatformConfig {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ValidationError::invalid_field(
                "platform",
                format!("dimensions must be non-zero, got {}x{}", self.width, self.height),
            ));
        }
        Ok(())
    }
}

/// A composition as stored by the project store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default)]
    pub platform: PlatformConfig,
    /// Declared duration in milliseconds
    pub duration_ms: u64,
    /// Ordered track items
    pub track_items: Vec<TrackItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_bar: Option<ProgressBarConfig>,
}

impl CompositionSpec {
    pub fn item(&self, id: &str) -> Option<&TrackItem> {
        self.track_items.iter().find(|item| item.id == id)
    }

    /// End of the last item, in milliseconds.
    pub fn content_end_ms(&self) -> u64 {
        self.track_items
            .iter()
            .map(|item| item.display.to)
            .max()
            .unwrap_or(0)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        self.platform.validate()?;
        for item in &self.track_items {
            if item.display.to < item.display.from {
                return Err(ValidationError::invalid_field(
                    format!("trackItems.{}.display", item.id),
                    format!("window ends before it starts ({} > {})", item.display.from, item.display.to),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_stretch_for_slow_motion() {
        let window = DisplayWindow::new(0, 2000);
        assert_eq!(window.stretched(0.5), DisplayWindow::new(0, 4000));

        let offset = DisplayWindow::new(1000, 3000);
        assert_eq!(offset.stretched(0.5), DisplayWindow::new(1000, 5000));
    }

    #[test]
    fn test_window_not_stretched_for_fast_rates() {
        let window = DisplayWindow::new(500, 2500);
        assert_eq!(window.stretched(2.0), window);
        assert_eq!(window.stretched(1.0), window);
    }

    #[test]
    fn test_track_item_deserialize_defaults() {
        let item: TrackItem = serde_json::from_value(serde_json::json!({
            "id": "v1",
            "type": "video",
            "display": {"from": 0, "to": 1000},
            "details": {"src": "https://cdn/a.mp4"}
        }))
        .unwrap();
        assert_eq!(item.kind, TrackItemKind::Video);
        assert_eq!(item.transform.scale, 1.0);
        assert_eq!(item.playback_rate(), 1.0);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let spec = CompositionSpec {
            duration_ms: 1000,
            track_items: vec![TrackItem::new(
                "t",
                TrackItemKind::Text,
                DisplayWindow::new(500, 100),
            )],
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }
}
