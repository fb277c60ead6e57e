//! Variation axes, elements and combinations.
//!
//! A [`VariationSet`] is an arena of [`VariationElement`]s. Each element
//! belongs to one axis and carries an ordered list of alternatives where
//! index 0 is the original content. A [`VariationCombination`] picks one
//! alternative index per axis present in the set.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{ValidationError, ValidationResult};

/// Category of variable content.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    Video,
    Image,
    Audio,
    Text,
    Font,
    Speed,
}

impl AxisKind {
    /// Order in which axes appear in output names.
    pub const NAMING_ORDER: [AxisKind; 6] = [
        AxisKind::Video,
        AxisKind::Text,
        AxisKind::Audio,
        AxisKind::Font,
        AxisKind::Speed,
        AxisKind::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AxisKind::Video => "video",
            AxisKind::Image => "image",
            AxisKind::Audio => "audio",
            AxisKind::Text => "text",
            AxisKind::Font => "font",
            AxisKind::Speed => "speed",
        }
    }

    /// Position of this axis in [`AxisKind::NAMING_ORDER`].
    pub fn naming_rank(&self) -> usize {
        Self::NAMING_ORDER
            .iter()
            .position(|axis| axis == self)
            .unwrap_or(Self::NAMING_ORDER.len())
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AxisKind {
    type Err = AxisParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" => Ok(AxisKind::Video),
            "image" => Ok(AxisKind::Image),
            "audio" => Ok(AxisKind::Audio),
            "text" => Ok(AxisKind::Text),
            "font" => Ok(AxisKind::Font),
            "speed" => Ok(AxisKind::Speed),
            _ => Err(AxisParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown axis: {0}")]
pub struct AxisParseError(String);

/// Content of one alternative, with a fixed schema per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariationValue {
    Video { src: String },
    Image { src: String },
    Audio { src: String },
    Text { text: String },
    Font {
        family: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Speed { factor: f64 },
}

impl VariationValue {
    pub fn axis(&self) -> AxisKind {
        match self {
            VariationValue::Video { .. } => AxisKind::Video,
            VariationValue::Image { .. } => AxisKind::Image,
            VariationValue::Audio { .. } => AxisKind::Audio,
            VariationValue::Text { .. } => AxisKind::Text,
            VariationValue::Font { .. } => AxisKind::Font,
            VariationValue::Speed { .. } => AxisKind::Speed,
        }
    }

    /// Media URL for video, image and audio alternatives.
    pub fn src(&self) -> Option<&str> {
        match self {
            VariationValue::Video { src }
            | VariationValue::Image { src }
            | VariationValue::Audio { src } => Some(src),
            _ => None,
        }
    }
}

/// One alternative of an element. Index 0 is the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Alternative {
    pub index: u32,
    pub value: VariationValue,
}

impl Alternative {
    pub fn is_original(&self) -> bool {
        self.index == 0
    }
}

/// A composition element with its ordered alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariationElement {
    pub element_id: String,
    pub axis: AxisKind,
    pub alternatives: Vec<Alternative>,
}

impl VariationElement {
    /// Create an element holding only its original content.
    pub fn new(element_id: impl Into<String>, original: VariationValue) -> Self {
        Self {
            element_id: element_id.into(),
            axis: original.axis(),
            alternatives: vec![Alternative {
                index: 0,
                value: original,
            }],
        }
    }

    /// Append an alternative; it receives the next 1-based index.
    pub fn with_alternative(mut self, value: VariationValue) -> Self {
        let index = self.alternatives.len() as u32;
        self.alternatives.push(Alternative { index, value });
        self
    }

    pub fn alternative(&self, index: u32) -> Option<&Alternative> {
        self.alternatives.iter().find(|alt| alt.index == index)
    }

    pub fn len(&self) -> u32 {
        self.alternatives.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Check that indices are 0..n in order and every value fits the axis.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.alternatives.is_empty() {
            return Err(ValidationError::invalid_field(
                format!("elements.{}", self.element_id),
                "element must carry its original alternative",
            ));
        }
        for (position, alt) in self.alternatives.iter().enumerate() {
            if alt.index != position as u32 {
                return Err(ValidationError::invalid_field(
                    format!("elements.{}.alternatives", self.element_id),
                    format!("expected index {} but found {}", position, alt.index),
                ));
            }
            if alt.value.axis() != self.axis {
                return Err(ValidationError::invalid_field(
                    format!("elements.{}.alternatives", self.element_id),
                    format!("{} value on a {} element", alt.value.axis(), self.axis),
                ));
            }
            if let VariationValue::Speed { factor } = alt.value {
                if !(factor.is_finite() && factor > 0.0) {
                    return Err(ValidationError::invalid_field(
                        format!("elements.{}.alternatives", self.element_id),
                        format!("speed factor must be positive, got {}", factor),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Arena of variation elements for one composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VariationSet {
    pub elements: Vec<VariationElement>,
}

impl VariationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from element id → ordered alternatives (index 0 = original).
    /// The axis of each element is taken from its original value.
    pub fn from_alternatives<I, S>(entries: I) -> ValidationResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<VariationValue>)>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for (element_id, values) in entries {
            let element_id = element_id.into();
            let mut values = values.into_iter();
            let original = values.next().ok_or_else(|| {
                ValidationError::invalid_field(
                    format!("elements.{}", element_id),
                    "no alternatives given",
                )
            })?;
            let element = values.fold(VariationElement::new(element_id, original), |el, v| {
                el.with_alternative(v)
            });
            set.push(element)?;
        }
        Ok(set)
    }

    /// Add an element after validating it.
    pub fn push(&mut self, element: VariationElement) -> ValidationResult<()> {
        element.validate()?;
        if element.axis == AxisKind::Speed && self.speed_element().is_some() {
            return Err(ValidationError::invalid_field(
                "elements",
                "only one speed element is allowed per composition",
            ));
        }
        self.elements.push(element);
        Ok(())
    }

    pub fn validate(&self) -> ValidationResult<()> {
        let mut speed_elements = 0;
        for element in &self.elements {
            element.validate()?;
            if element.axis == AxisKind::Speed {
                speed_elements += 1;
            }
        }
        if speed_elements > 1 {
            return Err(ValidationError::invalid_field(
                "elements",
                "only one speed element is allowed per composition",
            ));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements attached to a composition element id.
    pub fn for_element<'a>(
        &'a self,
        element_id: &'a str,
    ) -> impl Iterator<Item = &'a VariationElement> + 'a {
        self.elements
            .iter()
            .filter(move |el| el.element_id == element_id)
    }

    pub fn speed_element(&self) -> Option<&VariationElement> {
        self.elements.iter().find(|el| el.axis == AxisKind::Speed)
    }

    /// Present axes in naming order, with their alternative count.
    ///
    /// The count of an axis is the largest alternative list among its
    /// elements; elements with fewer alternatives keep their original
    /// beyond their own range.
    pub fn axes(&self) -> Vec<(AxisKind, u32)> {
        AxisKind::NAMING_ORDER
            .iter()
            .filter_map(|axis| {
                self.elements
                    .iter()
                    .filter(|el| el.axis == *axis)
                    .map(VariationElement::len)
                    .max()
                    .map(|count| (*axis, count))
            })
            .collect()
    }
}

/// The chosen alternative index of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AxisSelection {
    pub axis: AxisKind,
    pub index: u32,
}

/// One concrete selection of alternatives across the present axes.
///
/// Selections are kept in naming order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct VariationCombination {
    pub selections: Vec<AxisSelection>,
}

impl VariationCombination {
    pub fn new(mut selections: Vec<AxisSelection>) -> Self {
        selections.sort_by_key(|sel| sel.axis.naming_rank());
        Self { selections }
    }

    /// The all-original combination for the given axes.
    pub fn original<I>(axes: I) -> Self
    where
        I: IntoIterator<Item = AxisKind>,
    {
        Self::new(
            axes.into_iter()
                .map(|axis| AxisSelection { axis, index: 0 })
                .collect(),
        )
    }

    /// Chosen index for an axis; absent axes stay at the original.
    pub fn index_for(&self, axis: AxisKind) -> u32 {
        self.selections
            .iter()
            .find(|sel| sel.axis == axis)
            .map(|sel| sel.index)
            .unwrap_or(0)
    }

    pub fn is_original(&self) -> bool {
        self.selections.iter().all(|sel| sel.index == 0)
    }

    /// Check every selection against the axis counts of a set.
    pub fn validate_against(&self, set: &VariationSet) -> ValidationResult<()> {
        let axes = set.axes();
        for sel in &self.selections {
            let count = axes
                .iter()
                .find(|(axis, _)| *axis == sel.axis)
                .map(|(_, count)| *count)
                .unwrap_or(1);
            if sel.index >= count {
                return Err(ValidationError::IndexOutOfRange {
                    axis: sel.axis.to_string(),
                    index: sel.index,
                    count,
                });
            }
        }
        Ok(())
    }
}
