use super::{AppState, configured, requested_region};
use crate::{
    Result,
    types::{DictionaryResponse, ReferenceResponse, RegionQuery},
};
use axum::{
    Json,
    extract::{Path, Query, State},
};

pub async fn get_reference(
    State(state): State<AppState>,
    Path(sequence): Path<String>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<ReferenceResponse>> {
    let reader = configured(&state.reference, "reference")?;
    let region = requested_region(&state, &sequence, &query)?;
    let sequence = reader.bases(&region).await?;
    Ok(Json(ReferenceResponse { region, sequence }))
}

pub async fn get_dictionary(State(state): State<AppState>) -> Json<DictionaryResponse> {
    Json(DictionaryResponse {
        convention: state.dictionary.convention(),
        sequences: state.dictionary.iter().cloned().collect(),
    })
}
