//! Combination preview.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use vrender_compose::{
    generate_combinations_limited, GenerationPolicy, NamingConfig, RenderRequestBuilder,
};
use vrender_models::{AxisSelection, CompositionSpec, RenderSpec, VariationSet};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationsRequest {
    pub composition: CompositionSpec,
    pub variations: VariationSet,
    #[serde(default)]
    pub policy: GenerationPolicy,
    #[serde(default)]
    pub naming: NamingConfig,
    /// Lowered to the server ceiling when larger
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationView {
    pub name: String,
    pub is_original: bool,
    pub selections: Vec<AxisSelection>,
    pub render_spec: RenderSpec,
}

#[derive(Debug, Serialize)]
pub struct CombinationsResponse {
    pub policy: GenerationPolicy,
    pub count: usize,
    pub combinations: Vec<CombinationView>,
}

/// Enumerate every combination with its output name and render spec.
pub async fn preview_combinations(
    State(state): State<AppState>,
    Json(request): Json<CombinationsRequest>,
) -> ApiResult<Json<CombinationsResponse>> {
    let limit = request
        .limit
        .unwrap_or(state.config.max_combinations)
        .min(state.config.max_combinations);

    let builder =
        RenderRequestBuilder::new(&request.composition, &request.variations, &request.naming)?;
    let combinations = generate_combinations_limited(&request.variations, request.policy, limit)?
        .iter()
        .map(|combination| {
            let render_spec = builder.build(combination)?;
            Ok(CombinationView {
                name: render_spec.variation.name.clone(),
                is_original: combination.is_original(),
                selections: combination.selections.clone(),
                render_spec,
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(CombinationsResponse {
        policy: request.policy,
        count: combinations.len(),
        combinations,
    }))
}
