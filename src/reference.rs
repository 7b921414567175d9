//! Reference-base access over an indexed FASTA.

use crate::dictionary::SequenceDictionary;
use crate::interval::GenomicInterval;
use crate::{Error, Result};
use noodles::core::{Position, Region};
use noodles::fasta;
use noodles::fasta::fai;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ReferenceReader {
    path: PathBuf,
    index: fai::Index,
    dictionary: Arc<SequenceDictionary>,
}

impl ReferenceReader {
    /// Open `path`, reading its index from `path.fai`.
    pub fn open(path: &Path) -> Result<Self> {
        let index_path = PathBuf::from(format!("{}.fai", path.display()));
        let index = fai::read(&index_path).map_err(|e| {
            Error::InvalidInput(format!("failed to read FAI index {:?}: {}", index_path, e))
        })?;
        let dictionary = SequenceDictionary::from_fai_index(&index)?;

        Ok(Self {
            path: path.to_path_buf(),
            index,
            dictionary: Arc::new(dictionary),
        })
    }

    pub fn dictionary(&self) -> Arc<SequenceDictionary> {
        self.dictionary.clone()
    }

    /// Upper-cased reference bases for `interval`, clipped to the sequence end.
    /// The sequence name may use either naming convention.
    pub async fn bases(&self, interval: &GenomicInterval) -> Result<String> {
        let record = self
            .dictionary
            .resolve(&interval.sequence_name)
            .ok_or_else(|| {
                Error::InvalidRegion(format!("unknown sequence: {}", interval.sequence_name))
            })?;

        let end = interval.end.min(record.length);
        if interval.start >= end {
            return Ok(String::new());
        }

        // 0-based half-open to 1-based closed
        let start = Position::try_from(interval.start as usize + 1)
            .map_err(|e| Error::InvalidRegion(format!("invalid start position: {}", e)))?;
        let stop = Position::try_from(end as usize)
            .map_err(|e| Error::InvalidRegion(format!("invalid end position: {}", e)))?;
        let region = Region::new(record.name.clone(), start..=stop);

        let path = self.path.clone();
        let index = self.index.clone();
        let bases = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
            let mut reader = fasta::io::indexed_reader::Builder::default()
                .set_index(index)
                .build_from_path(&path)?;
            let record = reader.query(&region)?;
            Ok(record.sequence().as_ref().to_vec())
        })
        .await
        .map_err(|e| Error::Internal(format!("reference query task failed: {}", e)))?
        .map_err(|e| Error::load("reference", interval, e))?;

        Ok(String::from_utf8_lossy(&bases).to_ascii_uppercase())
    }
}
