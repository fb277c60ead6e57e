//! Output naming for variation combinations.
//!
//! A name is built from one `{label}-{axis}` part per present axis, in
//! [`AxisKind::NAMING_ORDER`], joined by `_`. The original alternative is
//! labelled `M`; other alternatives render their 1-based index through a
//! [`LabelPattern`]. Names may carry a sanitized prefix and always end in
//! `.mp4`.

use serde::{Deserialize, Serialize};
use vrender_models::{AxisKind, CompositionSpec, VariationCombination};

/// Label of the original alternative.
pub const ORIGINAL_LABEL: &str = "M";

const ROMAN_NUMERALS: [&str; 10] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];

/// How alternative indices are rendered in names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPattern {
    #[default]
    Numbers,
    LettersUpper,
    LettersLower,
    Roman,
    /// Labels from [`NamingConfig::custom_sequence`]
    Custom,
}

/// Naming options persisted with a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamingConfig {
    pub pattern: LabelPattern,
    /// User-supplied labels for the custom pattern, first entry = index 1
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_sequence: Vec<String>,
    /// Explicit prefix; wins over the project name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Prefix names with the composition's project name
    pub use_project_name: bool,
    /// Prefix names with the platform name
    pub use_platform_name: bool,
}

impl NamingConfig {
    pub fn with_pattern(pattern: LabelPattern) -> Self {
        Self {
            pattern,
            ..Default::default()
        }
    }

    pub fn with_custom_sequence(sequence: Vec<String>) -> Self {
        Self {
            pattern: LabelPattern::Custom,
            custom_sequence: sequence,
            ..Default::default()
        }
    }

    /// Label for an alternative index under this configuration.
    pub fn label(&self, index: u32) -> String {
        label_for(index, self.pattern, &self.custom_sequence)
    }

    /// Resolve the prefix for a composition, if any.
    pub fn prefix_for(&self, composition: &CompositionSpec) -> Option<String> {
        if let Some(prefix) = &self.prefix {
            return Some(prefix.clone());
        }
        let mut parts = Vec::new();
        if self.use_project_name {
            parts.extend(composition.project_name.clone());
        }
        if self.use_platform_name {
            parts.extend(composition.platform.name.clone());
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("_"))
        }
    }
}

/// Render a 1-based index through a pattern; index 0 is the original.
pub fn label_for(index: u32, pattern: LabelPattern, custom_sequence: &[String]) -> String {
    if index == 0 {
        return ORIGINAL_LABEL.to_string();
    }
    match pattern {
        LabelPattern::Numbers => index.to_string(),
        LabelPattern::LettersUpper => letters(index),
        LabelPattern::LettersLower => letters(index).to_lowercase(),
        LabelPattern::Roman => ROMAN_NUMERALS
            .get(index as usize - 1)
            .map(|numeral| numeral.to_string())
            .unwrap_or_else(|| index.to_string()),
        LabelPattern::Custom => custom_sequence
            .get(index as usize - 1)
            .filter(|label| !label.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| index.to_string()),
    }
}

/// Spreadsheet-style letters: 1 → A, 26 → Z, 27 → AA.
fn letters(index: u32) -> String {
    let mut n = index;
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// `{label}-{axis}` for every selection, in naming order.
pub fn naming_parts(combination: &VariationCombination, config: &NamingConfig) -> Vec<String> {
    let mut selections = combination.selections.clone();
    selections.sort_by_key(|sel| sel.axis.naming_rank());
    selections
        .iter()
        .map(|sel| format!("{}-{}", config.label(sel.index), sel.axis))
        .collect()
}

/// Full output file name for a combination.
pub fn output_name(
    combination: &VariationCombination,
    config: &NamingConfig,
    composition: &CompositionSpec,
) -> String {
    let mut segments = Vec::new();
    if let Some(prefix) = config.prefix_for(composition) {
        let prefix = sanitize_name(&prefix);
        if !prefix.is_empty() {
            segments.push(prefix);
        }
    }
    let parts = naming_parts(combination, config);
    if parts.is_empty() {
        segments.push(format!("{}-{}", ORIGINAL_LABEL, AxisKind::Video));
    } else {
        segments.push(parts.join("_"));
    }
    format!("{}.mp4", segments.join("_"))
}

/// Keep name-safe characters; whitespace runs become a single `_`.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() || ch == '-' {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else if ch.is_whitespace() || ch == '_' {
            pending_sep = true;
        }
    }
    out
}
