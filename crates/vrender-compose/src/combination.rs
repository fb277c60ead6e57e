//! Combination generation over the axes of a variation set.

use serde::{Deserialize, Serialize};
use vrender_models::{AxisKind, AxisSelection, VariationCombination, VariationSet};

use crate::error::{ComposeError, ComposeResult};

/// Which combinations to enumerate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPolicy {
    /// Vary one axis at a time, all others at the original
    #[default]
    SingleAxis,
    /// Every combination of every axis
    CrossProduct,
}

impl GenerationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationPolicy::SingleAxis => "single_axis",
            GenerationPolicy::CrossProduct => "cross_product",
        }
    }
}

/// Number of combinations a policy yields, saturating on overflow.
pub fn combination_count(set: &VariationSet, policy: GenerationPolicy) -> usize {
    let axes = set.axes();
    match policy {
        GenerationPolicy::SingleAxis => axes
            .iter()
            .fold(1usize, |acc, (_, n)| acc.saturating_add(n.saturating_sub(1) as usize)),
        GenerationPolicy::CrossProduct => axes
            .iter()
            .fold(1usize, |acc, (_, n)| acc.saturating_mul((*n).max(1) as usize)),
    }
}

/// Enumerate combinations in a stable order.
///
/// Single-axis starts with the all-original combination, then walks the
/// axes in naming order. Cross-product counts like an odometer whose last
/// axis (in naming order) turns fastest.
pub fn generate_combinations(
    set: &VariationSet,
    policy: GenerationPolicy,
) -> Vec<VariationCombination> {
    let axes = set.axes();
    match policy {
        GenerationPolicy::SingleAxis => single_axis(&axes),
        GenerationPolicy::CrossProduct => cross_product(&axes),
    }
}

/// Like [`generate_combinations`], refusing to enumerate past `limit`.
pub fn generate_combinations_limited(
    set: &VariationSet,
    policy: GenerationPolicy,
    limit: usize,
) -> ComposeResult<Vec<VariationCombination>> {
    let count = combination_count(set, policy);
    if count > limit {
        return Err(ComposeError::TooManyCombinations { count, limit });
    }
    Ok(generate_combinations(set, policy))
}

fn single_axis(axes: &[(AxisKind, u32)]) -> Vec<VariationCombination> {
    let original = VariationCombination::original(axes.iter().map(|(axis, _)| *axis));
    let mut out = vec![original.clone()];
    for (axis, count) in axes {
        for index in 1..*count {
            let mut combination = original.clone();
            for sel in combination.selections.iter_mut() {
                if sel.axis == *axis {
                    sel.index = index;
                }
            }
            out.push(combination);
        }
    }
    out
}

fn cross_product(axes: &[(AxisKind, u32)]) -> Vec<VariationCombination> {
    let mut indices = vec![0u32; axes.len()];
    let mut out = Vec::new();
    loop {
        out.push(VariationCombination::new(
            axes.iter()
                .zip(&indices)
                .map(|((axis, _), index)| AxisSelection {
                    axis: *axis,
                    index: *index,
                })
                .collect(),
        ));

        let mut position = axes.len();
        loop {
            if position == 0 {
                return out;
            }
            position -= 1;
            indices[position] += 1;
            if indices[position] < axes[position].1.max(1) {
                break;
            }
            indices[position] = 0;
        }
    }
}
