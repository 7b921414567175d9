//! Genomic intervals and chromosome naming normalization.
//!
//! Intervals are 0-based and half-open (`[start, end)`), the same convention
//! browsers use when requesting a view window.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const CHR_PREFIX: &str = "chr";

/// A half-open range on a named sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicInterval {
    #[serde(rename = "referenceName")]
    pub sequence_name: String,
    pub start: u64,
    pub end: u64,
}

impl GenomicInterval {
    pub fn new(sequence_name: impl Into<String>, start: u64, end: u64) -> Result<Self> {
        let sequence_name = sequence_name.into();
        if start > end {
            return Err(Error::InvalidRegion(format!(
                "{}:{}-{} has start after end",
                sequence_name, start, end
            )));
        }
        Ok(Self {
            sequence_name,
            start,
            end,
        })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Half-open overlap test. A zero-length interval is treated as the single
    /// position at `start`, so insertion points still match their window.
    pub fn overlaps(&self, other: &GenomicInterval) -> bool {
        if self.sequence_name != other.sequence_name {
            return false;
        }
        let self_end = self.end.max(self.start.saturating_add(1));
        let other_end = other.end.max(other.start.saturating_add(1));
        self.start < other_end && other.start < self_end
    }

    pub fn with_sequence_name(&self, name: impl Into<String>) -> Self {
        Self {
            sequence_name: name.into(),
            start: self.start,
            end: self.end,
        }
    }
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.sequence_name, self.start, self.end)
    }
}

/// Whether a catalog names its chromosomes `chr1, chr2, ...` or `1, 2, ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingConvention {
    Prefixed,
    Unprefixed,
}

pub fn has_chr_prefix(name: &str) -> bool {
    name.starts_with(CHR_PREFIX)
}

/// Rewrite a bare sequence name into `convention`.
pub fn normalize_name(name: &str, convention: NamingConvention) -> String {
    match convention {
        NamingConvention::Prefixed if !has_chr_prefix(name) => format!("{}{}", CHR_PREFIX, name),
        NamingConvention::Unprefixed if has_chr_prefix(name) => name[CHR_PREFIX.len()..].to_string(),
        _ => name.to_string(),
    }
}

/// Rewrite the sequence name of `region` into `convention`.
pub fn normalize(region: &GenomicInterval, convention: NamingConvention) -> GenomicInterval {
    region.with_sequence_name(normalize_name(&region.sequence_name, convention))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(name: &str, start: u64, end: u64) -> GenomicInterval {
        GenomicInterval::new(name, start, end).unwrap()
    }

    #[test]
    fn test_start_after_end_rejected() {
        let err = GenomicInterval::new("chr1", 10, 5).unwrap_err();
        assert!(matches!(err, Error::InvalidRegion(_)));
    }

    #[test]
    fn test_overlaps_half_open() {
        let a = region("chr1", 0, 10);
        assert!(a.overlaps(&region("chr1", 9, 20)));
        assert!(!a.overlaps(&region("chr1", 10, 20)));
        assert!(!a.overlaps(&region("chr2", 0, 10)));
    }

    #[test]
    fn test_zero_length_overlaps_as_point() {
        let window = region("chr1", 5, 10);
        assert!(region("chr1", 5, 5).overlaps(&window));
        assert!(!region("chr1", 10, 10).overlaps(&window));
        assert!(window.overlaps(&region("chr1", 9, 9)));
    }

    #[test]
    fn test_overlaps_at_coordinate_limit() {
        let last = region("chr1", u64::MAX, u64::MAX);
        assert!(!last.overlaps(&region("chr1", 0, 10)));
        assert!(!region("chr1", u64::MAX - 10, u64::MAX).overlaps(&last));
    }

    #[test]
    fn test_normalize_prefixed_convention() {
        let p = NamingConvention::Prefixed;
        assert_eq!(normalize(&region("20", 0, 1), p).sequence_name, "chr20");
        assert_eq!(normalize(&region("chr20", 0, 1), p).sequence_name, "chr20");
        assert_eq!(normalize(&region("chrM", 0, 1), p).sequence_name, "chrM");
    }

    #[test]
    fn test_normalize_unprefixed_convention() {
        let u = NamingConvention::Unprefixed;
        assert_eq!(normalize(&region("chr20", 0, 1), u).sequence_name, "20");
        assert_eq!(normalize(&region("20", 0, 1), u).sequence_name, "20");
        assert_eq!(normalize(&region("chr", 0, 1), u).sequence_name, "");
    }

    #[test]
    fn test_normalize_keeps_coordinates() {
        let n = normalize(&region("7", 100, 250), NamingConvention::Prefixed);
        assert_eq!((n.start, n.end), (100, 250));
    }

    #[test]
    fn test_display() {
        assert_eq!(region("chrX", 1, 5).to_string(), "chrX:1-5");
    }
}
