use super::{SourceFiles, match_sequence_name, to_region};
use crate::engine::{GenomicRecord, Loader};
use crate::interval::GenomicInterval;
use crate::records::Variant;
use crate::{Error, Result};
use async_trait::async_trait;
use noodles::vcf;
use noodles::vcf::variant::record::{AlternateBases as _, Ids as _};
use std::io;
use std::path::Path;

/// Reads variants from bgzipped VCF files with a tabix index.
pub struct VcfLoader {
    files: SourceFiles,
}

impl VcfLoader {
    pub fn new(files: SourceFiles) -> Self {
        Self { files }
    }
}

#[async_trait]
impl Loader<Variant> for VcfLoader {
    async fn load(&self, key: &str, interval: &GenomicInterval) -> Result<Vec<Variant>> {
        let path = self.files.path(key)?.to_path_buf();
        let query = interval.clone();

        tokio::task::spawn_blocking(move || read_variants(&path, &query))
            .await
            .map_err(|e| Error::Internal(format!("VCF query task failed: {}", e)))?
            .map_err(|e| Error::load(key, interval, e))
    }
}

fn read_variants(path: &Path, interval: &GenomicInterval) -> io::Result<Vec<Variant>> {
    if interval.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = vcf::io::indexed_reader::Builder::default().build_from_path(path)?;
    let header = reader.read_header()?;

    let Some(name) = match_sequence_name(header.contigs().keys(), &interval.sequence_name) else {
        tracing::debug!("{:?} has no contig {}", path, interval.sequence_name);
        return Ok(Vec::new());
    };
    let region = to_region(&name, interval)?;

    let mut variants = Vec::new();
    for result in reader.query(&header, &region)? {
        let record = result?;
        let Some(position) = record.variant_start().transpose()? else {
            continue;
        };

        let start = (usize::from(position) - 1) as u64;
        let reference_bases = record.reference_bases().to_string();
        let variant = Variant {
            sequence_name: interval.sequence_name.clone(),
            start,
            end: start + reference_bases.len() as u64,
            ids: record.ids().iter().map(String::from).collect(),
            reference_bases,
            alternate_bases: record
                .alternate_bases()
                .iter()
                .map(|result| result.map(String::from))
                .collect::<io::Result<_>>()?,
        };

        if variant.region().overlaps(interval) {
            variants.push(variant);
        }
    }

    tracing::debug!("{} variants from {:?} at {}", variants.len(), path, interval);
    Ok(variants)
}
