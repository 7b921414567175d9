mod features;
mod reads;
mod reference;
mod service_info;
mod variants;

pub use features::get_features;
pub use reads::get_reads;
pub use reference::{get_dictionary, get_reference};
pub use service_info::service_info;
pub use variants::get_variants;

use crate::dictionary::SequenceDictionary;
use crate::engine::MaterializationEngine;
use crate::interval::GenomicInterval;
use crate::records::{Alignment, Feature, Variant};
use crate::reference::ReferenceReader;
use crate::types::RegionQuery;
use crate::{Error, Result};
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dictionary: Arc<SequenceDictionary>,
    pub reads: Option<Arc<MaterializationEngine<Alignment>>>,
    pub variants: Option<Arc<MaterializationEngine<Variant>>>,
    pub features: Option<Arc<MaterializationEngine<Feature>>>,
    pub reference: Option<Arc<ReferenceReader>>,
    pub max_region_length: u64,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/reads/:key/:sequence", get(get_reads))
        .route("/variants/:key/:sequence", get(get_variants))
        .route("/features/:key/:sequence", get(get_features))
        .route("/reference/:sequence", get(get_reference))
        .route("/sequence-dictionary", get(get_dictionary))
        .route("/", get(service_info))
        .route("/service-info", get(service_info))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Build the requested interval, defaulting to the whole sequence and
/// enforcing the configured width limit.
pub(crate) fn requested_region(
    state: &AppState,
    sequence: &str,
    query: &RegionQuery,
) -> Result<GenomicInterval> {
    let record = state
        .dictionary
        .resolve(sequence)
        .ok_or_else(|| Error::InvalidRegion(format!("unknown sequence: {}", sequence)))?;

    let start = query.start.unwrap_or(0);
    if start > record.length {
        return Err(Error::InvalidRegion(format!(
            "start {} is past the end of {} ({} bases)",
            start, sequence, record.length
        )));
    }
    let end = query.end.unwrap_or(record.length);
    let region = GenomicInterval::new(sequence, start, end)?;

    if region.len() > state.max_region_length {
        return Err(Error::PayloadTooLarge(format!(
            "{} spans {} bases, limit is {}",
            region,
            region.len(),
            state.max_region_length
        )));
    }
    Ok(region)
}

pub(crate) fn configured<T>(engine: &Option<Arc<T>>, datatype: &str) -> Result<Arc<T>> {
    engine
        .clone()
        .ok_or_else(|| Error::NotFound(format!("no {} configured", datatype)))
}
