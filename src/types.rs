use crate::dictionary::SequenceRecord;
use crate::interval::{GenomicInterval, NamingConvention};
use crate::mismatch::Mismatch;
use crate::records::Alignment;
use serde::{Deserialize, Serialize};

/// Query parameters for region endpoints. Missing bounds default to the
/// whole sequence.
#[derive(Debug, Deserialize, Default)]
pub struct RegionQuery {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

/// Records of one type overlapping a region.
#[derive(Debug, Serialize)]
pub struct RecordsResponse<T> {
    pub region: GenomicInterval,
    pub records: Vec<T>,
}

/// An alignment with its differences from the reference.
#[derive(Debug, Serialize)]
pub struct AlignmentView {
    #[serde(flatten)]
    pub alignment: Alignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatches: Option<Vec<Mismatch>>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub region: GenomicInterval,
    pub sequence: String,
}

#[derive(Debug, Serialize)]
pub struct DictionaryResponse {
    pub convention: NamingConvention,
    pub sequences: Vec<SequenceRecord>,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub description: String,
    pub version: String,
    pub reference: bool,
    pub datasets: Vec<DatasetInfo>,
}

#[derive(Debug, Serialize)]
pub struct DatasetInfo {
    pub datatype: &'static str,
    pub keys: Vec<String>,
}
