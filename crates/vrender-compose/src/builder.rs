//! Resolution of a composition and one combination into a [`RenderSpec`].

use tracing::{debug, warn};
use vrender_models::{
    clamp_duration, AxisKind, CompositionSpec, DurationClamp, RenderSpec, TextOverlay, TextStyle,
    TrackItem, TrackItemKind, ValidationError, VariationCombination, VariationSet,
    VariationSummary, VariationValue,
};

use crate::combination::{generate_combinations, GenerationPolicy};
use crate::error::ComposeResult;
use crate::naming::{naming_parts, output_name, NamingConfig};

/// Builds render specs for the combinations of one composition.
///
/// The composition and variation set are checked once in [`new`]; every
/// [`build`] call only validates the combination it is given.
///
/// [`new`]: RenderRequestBuilder::new
/// [`build`]: RenderRequestBuilder::build
#[derive(Debug, Clone)]
pub struct RenderRequestBuilder<'a> {
    composition: &'a CompositionSpec,
    variations: &'a VariationSet,
    naming: &'a NamingConfig,
}

impl<'a> RenderRequestBuilder<'a> {
    pub fn new(
        composition: &'a CompositionSpec,
        variations: &'a VariationSet,
        naming: &'a NamingConfig,
    ) -> ComposeResult<Self> {
        composition.validate()?;
        variations.validate()?;

        for element in &variations.elements {
            // The speed axis is global, its element id names no track item.
            if element.axis == AxisKind::Speed {
                continue;
            }
            let item = composition
                .item(&element.element_id)
                .ok_or_else(|| ValidationError::UnknownElement(element.element_id.clone()))?;
            if !axis_applies_to(element.axis, item.kind) {
                return Err(ValidationError::invalid_field(
                    format!("elements.{}", element.element_id),
                    format!("{} alternatives cannot apply to a {} item", element.axis, item.kind.as_str()),
                )
                .into());
            }
        }

        Ok(Self {
            composition,
            variations,
            naming,
        })
    }

    /// Resolve one combination.
    pub fn build(&self, combination: &VariationCombination) -> ComposeResult<RenderSpec> {
        combination.validate_against(self.variations)?;

        let speed = self.speed_factor(combination);
        let mut video_track_items = Vec::new();
        let mut audio_track_items = Vec::new();
        let mut text_overlays = Vec::new();

        for original in &self.composition.track_items {
            let mut item = original.clone();
            self.substitute(&mut item, combination);

            match item.kind {
                TrackItemKind::Video => {
                    apply_speed(&mut item, speed);
                    video_track_items.push(item);
                }
                TrackItemKind::Image => video_track_items.push(item),
                TrackItemKind::Audio => audio_track_items.push(item),
                TrackItemKind::Text => text_overlays.push(TextOverlay {
                    id: item.id,
                    text: item.details.text.unwrap_or_default(),
                    display: item.display,
                    transform: item.transform,
                    style: item.details.style.unwrap_or_default(),
                }),
            }
        }

        let requested = self.requested_duration(&video_track_items, speed);
        let (duration, duration_clamp) = clamp_to_ceiling(requested);

        let variation = VariationSummary {
            name: output_name(combination, self.naming, self.composition),
            is_original: combination.is_original(),
            selections: combination.selections.clone(),
            naming_parts: naming_parts(combination, self.naming),
        };
        debug!(
            variation = %variation.name,
            speed,
            duration,
            "Resolved render spec"
        );

        let spec = RenderSpec {
            variation,
            text_overlays,
            platform: self.composition.platform.clone(),
            duration,
            video_track_items,
            audio_track_items,
            progress_bar: self.composition.progress_bar.clone(),
            speed_factor: speed,
            duration_clamp,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Resolve every combination a policy yields, in generation order.
    pub fn build_all(&self, policy: GenerationPolicy) -> ComposeResult<Vec<RenderSpec>> {
        generate_combinations(self.variations, policy)
            .iter()
            .map(|combination| self.build(combination))
            .collect()
    }

    /// Chosen speed factor, 1.0 without a speed axis.
    fn speed_factor(&self, combination: &VariationCombination) -> f64 {
        let Some(element) = self.variations.speed_element() else {
            return 1.0;
        };
        let index = combination.index_for(AxisKind::Speed);
        match element.alternative(index).map(|alt| &alt.value) {
            Some(VariationValue::Speed { factor }) => *factor,
            _ => 1.0,
        }
    }

    fn substitute(&self, item: &mut TrackItem, combination: &VariationCombination) {
        for element in self.variations.for_element(&item.id) {
            let index = combination.index_for(element.axis);
            if index == 0 {
                continue;
            }
            // Elements shorter than their axis keep the original.
            let Some(alternative) = element.alternative(index) else {
                continue;
            };
            match &alternative.value {
                VariationValue::Video { src }
                | VariationValue::Image { src }
                | VariationValue::Audio { src } => item.details.src = Some(src.clone()),
                VariationValue::Text { text } => item.details.text = Some(text.clone()),
                VariationValue::Font { family, url } => {
                    let style = item.details.style.get_or_insert_with(TextStyle::default);
                    style.font_family = Some(family.clone());
                    if url.is_some() {
                        style.font_url = url.clone();
                    }
                }
                VariationValue::Speed { .. } => {}
            }
        }
    }

    fn requested_duration(&self, video_items: &[TrackItem], speed: f64) -> u64 {
        let declared = match self.composition.duration_ms {
            0 => self.composition.content_end_ms(),
            ms => ms,
        };
        if speed < 1.0 {
            let stretched_end = video_items
                .iter()
                .map(|item| item.display.to)
                .max()
                .unwrap_or(0);
            declared.max(stretched_end)
        } else {
            declared
        }
    }
}

fn axis_applies_to(axis: AxisKind, kind: TrackItemKind) -> bool {
    matches!(
        (axis, kind),
        (AxisKind::Video, TrackItemKind::Video)
            | (AxisKind::Image, TrackItemKind::Image)
            | (AxisKind::Audio, TrackItemKind::Audio)
            | (AxisKind::Text, TrackItemKind::Text)
            | (AxisKind::Font, TrackItemKind::Text)
    )
}

/// Compound the axis factor into the item's own rate.
///
/// The window stretch follows the axis factor only: an item's own rate is
/// already reflected in its authored window.
fn apply_speed(item: &mut TrackItem, speed: f64) {
    if speed == 1.0 {
        return;
    }
    item.details.playback_rate = Some(item.playback_rate() * speed);
    if speed < 1.0 {
        item.display = item.display.stretched(speed);
    }
}

fn clamp_to_ceiling(requested: u64) -> (u64, Option<DurationClamp>) {
    let (duration, clamp) = clamp_duration(requested);
    if clamp.is_some() {
        warn!(
            requested_ms = requested,
            clamped_ms = duration,
            "Render duration exceeds ceiling, clamping"
        );
    }
    (duration, clamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComposeError;
    use vrender_models::{
        AxisSelection, DisplayWindow, VariationElement, MAX_RENDER_DURATION_MS,
    };

    fn composition() -> CompositionSpec {
        CompositionSpec {
            project_name: Some("Launch".into()),
            duration_ms: 6000,
            track_items: vec![
                TrackItem::new("clip-a", TrackItemKind::Video, DisplayWindow::new(0, 2000))
                    .with_src("https://cdn/a.mp4"),
                TrackItem::new("clip-b", TrackItemKind::Video, DisplayWindow::new(2000, 6000))
                    .with_src("https://cdn/b.mp4"),
                TrackItem::new("music", TrackItemKind::Audio, DisplayWindow::new(0, 6000))
                    .with_src("https://cdn/music.mp3"),
                TrackItem::new("title", TrackItemKind::Text, DisplayWindow::new(0, 3000))
                    .with_text("Hello"),
                TrackItem::new("cta", TrackItemKind::Text, DisplayWindow::new(3000, 6000))
                    .with_text("Buy now"),
            ],
            ..Default::default()
        }
    }

    fn variations() -> VariationSet {
        VariationSet::from_alternatives(vec![
            (
                "title",
                vec![
                    VariationValue::Text { text: "Hello".into() },
                    VariationValue::Text { text: "Hi".into() },
                ],
            ),
            (
                "clip-a",
                vec![
                    VariationValue::Video {
                        src: "https://cdn/a.mp4".into(),
                    },
                    VariationValue::Video {
                        src: "https://cdn/a2.mp4".into(),
                    },
                ],
            ),
            (
                "speed",
                vec![
                    VariationValue::Speed { factor: 1.0 },
                    VariationValue::Speed { factor: 0.5 },
                    VariationValue::Speed { factor: 2.0 },
                ],
            ),
        ])
        .unwrap()
    }

    fn combo(selections: &[(AxisKind, u32)]) -> VariationCombination {
        VariationCombination::new(
            selections
                .iter()
                .map(|(axis, index)| AxisSelection {
                    axis: *axis,
                    index: *index,
                })
                .collect(),
        )
    }

    #[test]
    fn test_text_substituted_by_element_id() {
        let (composition, set, naming) = (composition(), variations(), NamingConfig::default());
        let builder = RenderRequestBuilder::new(&composition, &set, &naming).unwrap();
        let spec = builder.build(&combo(&[(AxisKind::Text, 1)])).unwrap();

        let title = spec.text_overlays.iter().find(|o| o.id == "title").unwrap();
        let cta = spec.text_overlays.iter().find(|o| o.id == "cta").unwrap();
        assert_eq!(title.text, "Hi");
        assert_eq!(cta.text, "Buy now");
        assert!(!spec.variation.is_original);
    }

    #[test]
    fn test_media_substituted_and_routed() {
        let (composition, set, naming) = (composition(), variations(), NamingConfig::default());
        let builder = RenderRequestBuilder::new(&composition, &set, &naming).unwrap();
        let spec = builder.build(&combo(&[(AxisKind::Video, 1)])).unwrap();

        assert_eq!(spec.video_track_items.len(), 2);
        assert_eq!(spec.audio_track_items.len(), 1);
        assert_eq!(spec.text_overlays.len(), 2);
        assert_eq!(
            spec.video_track_items[0].details.src.as_deref(),
            Some("https://cdn/a2.mp4")
        );
        assert_eq!(
            spec.video_track_items[1].details.src.as_deref(),
            Some("https://cdn/b.mp4")
        );
    }

    #[test]
    fn test_slow_motion_stretches_every_video_item() {
        let (composition, set, naming) = (composition(), variations(), NamingConfig::default());
        let builder = RenderRequestBuilder::new(&composition, &set, &naming).unwrap();
        let spec = builder.build(&combo(&[(AxisKind::Speed, 1)])).unwrap();

        assert_eq!(spec.speed_factor, 0.5);
        assert_eq!(spec.video_track_items[0].display, DisplayWindow::new(0, 4000));
        assert_eq!(spec.video_track_items[1].display, DisplayWindow::new(2000, 10000));
        for item in &spec.video_track_items {
            assert_eq!(item.playback_rate(), 0.5);
        }
        assert_eq!(spec.audio_track_items[0].display, DisplayWindow::new(0, 6000));
        assert_eq!(spec.duration, 10000);
    }

    #[test]
    fn test_slow_motion_stretch_ignores_authored_rate() {
        let (mut composition, set, naming) = (composition(), variations(), NamingConfig::default());
        composition.track_items[0].details.playback_rate = Some(2.0);
        let builder = RenderRequestBuilder::new(&composition, &set, &naming).unwrap();
        let spec = builder.build(&combo(&[(AxisKind::Speed, 1)])).unwrap();

        let clip = &spec.video_track_items[0];
        assert_eq!(clip.playback_rate(), 1.0);
        assert_eq!(clip.display, DisplayWindow::new(0, 4000));
    }

    #[test]
    fn test_fast_speed_keeps_windows() {
        let (composition, set, naming) = (composition(), variations(), NamingConfig::default());
        let builder = RenderRequestBuilder::new(&composition, &set, &naming).unwrap();
        let spec = builder.build(&combo(&[(AxisKind::Speed, 2)])).unwrap();

        assert_eq!(spec.video_track_items[0].display, DisplayWindow::new(0, 2000));
        assert_eq!(spec.video_track_items[0].playback_rate(), 2.0);
        assert_eq!(spec.duration, 6000);
    }

    #[test]
    fn test_duration_clamped_not_rejected() {
        let mut composition = composition();
        composition.duration_ms = 400_000;
        let (set, naming) = (VariationSet::new(), NamingConfig::default());
        let builder = RenderRequestBuilder::new(&composition, &set, &naming).unwrap();
        let spec = builder.build(&VariationCombination::default()).unwrap();

        assert_eq!(spec.duration, MAX_RENDER_DURATION_MS);
        assert_eq!(
            spec.duration_clamp,
            Some(DurationClamp {
                requested_ms: 400_000,
                clamped_ms: MAX_RENDER_DURATION_MS
            })
        );
    }

    #[test]
    fn test_unknown_element_rejected() {
        let composition = composition();
        let naming = NamingConfig::default();
        let mut set = VariationSet::new();
        set.push(VariationElement::new(
            "missing",
            VariationValue::Text { text: "x".into() },
        ))
        .unwrap();
        let err = RenderRequestBuilder::new(&composition, &set, &naming).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::Validation(ValidationError::UnknownElement(ref id)) if id == "missing"
        ));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let (composition, set, naming) = (composition(), variations(), NamingConfig::default());
        let builder = RenderRequestBuilder::new(&composition, &set, &naming).unwrap();
        let err = builder.build(&combo(&[(AxisKind::Text, 5)])).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::Validation(ValidationError::IndexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn test_shorter_element_keeps_original() {
        let composition = composition();
        let naming = NamingConfig::default();
        let set = VariationSet::from_alternatives(vec![
            (
                "title",
                vec![
                    VariationValue::Text { text: "Hello".into() },
                    VariationValue::Text { text: "Hi".into() },
                    VariationValue::Text { text: "Hey".into() },
                ],
            ),
            (
                "cta",
                vec![
                    VariationValue::Text {
                        text: "Buy now".into(),
                    },
                    VariationValue::Text {
                        text: "Shop".into(),
                    },
                ],
            ),
        ])
        .unwrap();
        let builder = RenderRequestBuilder::new(&composition, &set, &naming).unwrap();
        let spec = builder.build(&combo(&[(AxisKind::Text, 2)])).unwrap();

        assert_eq!(spec.text_overlays[0].text, "Hey");
        assert_eq!(spec.text_overlays[1].text, "Buy now");
    }

    #[test]
    fn test_build_all_names_outputs() {
        let (composition, set, naming) = (composition(), variations(), NamingConfig::default());
        let builder = RenderRequestBuilder::new(&composition, &set, &naming).unwrap();
        let specs = builder.build_all(GenerationPolicy::SingleAxis).unwrap();

        assert_eq!(specs.len(), 1 + 1 + 1 + 2);
        assert_eq!(specs[0].variation.name, "M-video_M-text_M-speed.mp4");
        assert!(specs[0].variation.is_original);
        assert_eq!(specs[1].variation.name, "1-video_M-text_M-speed.mp4");
    }

    #[test]
    fn test_font_alternative_sets_style() {
        let composition = composition();
        let naming = NamingConfig::default();
        let set = VariationSet::from_alternatives(vec![(
            "title",
            vec![
                VariationValue::Font {
                    family: "Inter".into(),
                    url: None,
                },
                VariationValue::Font {
                    family: "Bebas Neue".into(),
                    url: Some("https://fonts/bebas.woff2".into()),
                },
            ],
        )])
        .unwrap();
        let builder = RenderRequestBuilder::new(&composition, &set, &naming).unwrap();
        let spec = builder.build(&combo(&[(AxisKind::Font, 1)])).unwrap();

        let style = &spec.text_overlays[0].style;
        assert_eq!(style.font_family.as_deref(), Some("Bebas Neue"));
        assert_eq!(style.font_url.as_deref(), Some("https://fonts/bebas.woff2"));
    }
}
