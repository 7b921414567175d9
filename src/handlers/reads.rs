use super::{AppState, configured, requested_region};
use crate::{
    Result, mismatch,
    types::{AlignmentView, RecordsResponse, RegionQuery},
};
use axum::{
    Json,
    extract::{Path, Query, State},
};

/// Alignments overlapping a region. With a reference configured, each read
/// carries its mismatches and indels.
pub async fn get_reads(
    State(state): State<AppState>,
    Path((key, sequence)): Path<(String, String)>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<RecordsResponse<AlignmentView>>> {
    let engine = configured(&state.reads, "reads")?;
    let region = requested_region(&state, &sequence, &query)?;

    let alignments = engine.get(&key, &region).await?;

    let reference = match &state.reference {
        Some(reader) => Some(reader.bases(&region).await?),
        None => None,
    };

    let records = alignments
        .into_iter()
        .map(|alignment| {
            let mismatches = reference
                .as_deref()
                .map(|bases| mismatch::extract(&alignment, bases, &region));
            AlignmentView {
                alignment,
                mismatches,
            }
        })
        .collect();

    Ok(Json(RecordsResponse { region, records }))
}
