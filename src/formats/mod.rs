//! Format-specific loaders feeding the materialization engine.
//!
//! Each loader maps a data-source key to a file on disk and reads the records
//! overlapping a requested interval.
//!
//! # Supported Formats
//!
//! - [`BamLoader`] - indexed BAM alignments (`.bai`)
//! - [`VcfLoader`] - bgzipped, tabix-indexed VCF variants (`.tbi`)
//! - [`BedLoader`] - plain BED features (scanned, no index)
//!
//! Files may name their sequences with or without the `chr` prefix; loaders
//! match requested names in either convention and return records named as
//! requested.

mod bam;
mod bed;
mod vcf;

pub use bam::BamLoader;
pub use bed::BedLoader;
pub use vcf::VcfLoader;

use crate::interval::{self, GenomicInterval, NamingConvention};
use crate::{Error, Result};
use noodles::core::{Position, Region};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Extensions stripped from a file name to form its data-source key.
const KNOWN_EXTENSIONS: &[&str] = &[".vcf.gz", ".bam", ".vcf", ".bed"];

/// Data-source keys and the files behind them.
#[derive(Debug, Clone, Default)]
pub struct SourceFiles {
    paths: HashMap<String, PathBuf>,
}

impl SourceFiles {
    /// Key each path by its file name minus the format extension
    /// (`data/NA12878.bam` is served as `NA12878`).
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self> {
        let mut map = HashMap::new();
        for path in paths {
            let key = source_key(path)?;
            if let Some(previous) = map.insert(key.clone(), path.clone()) {
                return Err(Error::InvalidInput(format!(
                    "{:?} and {:?} both map to key {}",
                    previous, path, key
                )));
            }
        }
        Ok(Self { paths: map })
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.paths.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn path(&self, key: &str) -> Result<&Path> {
        self.paths
            .get(key)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::NotFound(format!("data source: {}", key)))
    }
}

fn source_key(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidInput(format!("invalid data file path: {:?}", path)))?;

    let key = KNOWN_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name);
    if key.is_empty() {
        return Err(Error::InvalidInput(format!("invalid data file path: {:?}", path)));
    }
    Ok(key.to_string())
}

/// Pick the file's spelling of `requested`, trying the exact name first and
/// then the other `chr` convention.
pub(crate) fn match_sequence_name<I, S>(names: I, requested: &str) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: Vec<S> = names.into_iter().collect();
    if names.iter().any(|name| name.as_ref() == requested) {
        return Some(requested.to_string());
    }

    let alternate = if interval::has_chr_prefix(requested) {
        interval::normalize_name(requested, NamingConvention::Unprefixed)
    } else {
        interval::normalize_name(requested, NamingConvention::Prefixed)
    };
    names
        .iter()
        .find(|name| name.as_ref() == alternate)
        .map(|name| name.as_ref().to_string())
}

/// Whether two sequence names refer to the same sequence, ignoring `chr`.
pub(crate) fn same_sequence(a: &str, b: &str) -> bool {
    a == b
        || interval::normalize_name(a, NamingConvention::Unprefixed)
            == interval::normalize_name(b, NamingConvention::Unprefixed)
}

/// Convert a non-empty 0-based half-open interval to a noodles region
/// (1-based, closed) on `name`.
pub(crate) fn to_region(name: &str, interval: &GenomicInterval) -> std::io::Result<Region> {
    let start = Position::try_from(interval.start as usize + 1)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let end = Position::try_from(interval.end as usize)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    Ok(Region::new(name, start..=end))
}
