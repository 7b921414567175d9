use super::{AppState, configured, requested_region};
use crate::{
    Result,
    records::Variant,
    types::{RecordsResponse, RegionQuery},
};
use axum::{
    Json,
    extract::{Path, Query, State},
};

pub async fn get_variants(
    State(state): State<AppState>,
    Path((key, sequence)): Path<(String, String)>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<RecordsResponse<Variant>>> {
    let engine = configured(&state.variants, "variants")?;
    let region = requested_region(&state, &sequence, &query)?;
    let records = engine.get(&key, &region).await?;
    Ok(Json(RecordsResponse { region, records }))
}
