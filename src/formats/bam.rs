use super::{SourceFiles, match_sequence_name, to_region};
use crate::engine::{GenomicRecord, Loader};
use crate::interval::GenomicInterval;
use crate::records::{Alignment, CigarKind, CigarOp, reference_span};
use crate::{Error, Result};
use async_trait::async_trait;
use noodles::bam;
use noodles::sam::alignment::record::cigar::op::Kind;
use std::io;
use std::path::Path;

/// Reads alignments from indexed BAM files.
pub struct BamLoader {
    files: SourceFiles,
}

impl BamLoader {
    pub fn new(files: SourceFiles) -> Self {
        Self { files }
    }
}

#[async_trait]
impl Loader<Alignment> for BamLoader {
    async fn load(&self, key: &str, interval: &GenomicInterval) -> Result<Vec<Alignment>> {
        let path = self.files.path(key)?.to_path_buf();
        let query = interval.clone();

        tokio::task::spawn_blocking(move || read_alignments(&path, &query))
            .await
            .map_err(|e| Error::Internal(format!("BAM query task failed: {}", e)))?
            .map_err(|e| Error::load(key, interval, e))
    }
}

fn read_alignments(path: &Path, interval: &GenomicInterval) -> io::Result<Vec<Alignment>> {
    if interval.is_empty() {
        return Ok(Vec::new());
    }

    // bam::io::indexed_reader wraps the file in BGZF and finds the .bai next to it
    let mut reader = bam::io::indexed_reader::Builder::default().build_from_path(path)?;
    let header = reader.read_header()?;

    let names = header
        .reference_sequences()
        .keys()
        .map(|name| name.to_string());
    let Some(name) = match_sequence_name(names, &interval.sequence_name) else {
        tracing::debug!("{:?} has no sequence {}", path, interval.sequence_name);
        return Ok(Vec::new());
    };
    let region = to_region(&name, interval)?;

    let mut alignments = Vec::new();
    for result in reader.query(&header, &region)? {
        let record = result?;
        if let Some(alignment) = convert(&record, &interval.sequence_name)? {
            if alignment.region().overlaps(interval) {
                alignments.push(alignment);
            }
        }
    }

    tracing::debug!("{} alignments from {:?} at {}", alignments.len(), path, interval);
    Ok(alignments)
}

/// Unmapped records (no alignment start) are skipped.
fn convert(record: &bam::Record, sequence_name: &str) -> io::Result<Option<Alignment>> {
    let Some(alignment_start) = record.alignment_start().transpose()? else {
        return Ok(None);
    };
    let start = (usize::from(alignment_start) - 1) as u64;

    let cigar = record
        .cigar()
        .iter()
        .map(|result| {
            result.map(|op| CigarOp::new(cigar_kind(op.kind()), op.len() as u64))
        })
        .collect::<io::Result<Vec<_>>>()?;

    let sequence: String = record.sequence().iter().map(char::from).collect();

    Ok(Some(Alignment {
        name: record
            .name()
            .map(|name| name.to_string())
            .unwrap_or_else(|| "*".to_string()),
        sequence_name: sequence_name.to_string(),
        start,
        end: start + reference_span(&cigar),
        mapping_quality: record.mapping_quality().map(|mq| mq.get()),
        flags: u16::from(record.flags()),
        cigar,
        sequence: if sequence.is_empty() {
            "*".to_string()
        } else {
            sequence
        },
    }))
}

fn cigar_kind(kind: Kind) -> CigarKind {
    match kind {
        Kind::Match => CigarKind::Match,
        Kind::Insertion => CigarKind::Insertion,
        Kind::Deletion => CigarKind::Deletion,
        Kind::Skip => CigarKind::Skip,
        Kind::SoftClip => CigarKind::SoftClip,
        Kind::HardClip => CigarKind::HardClip,
        Kind::Pad => CigarKind::Pad,
        Kind::SequenceMatch => CigarKind::SequenceMatch,
        Kind::SequenceMismatch => CigarKind::SequenceMismatch,
    }
}
