//! Record types served by the browser backend.

use crate::engine::GenomicRecord;
use crate::interval::GenomicInterval;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// CIGAR operation kinds as defined by SAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CigarKind {
    #[serde(rename = "M")]
    Match,
    #[serde(rename = "I")]
    Insertion,
    #[serde(rename = "D")]
    Deletion,
    #[serde(rename = "N")]
    Skip,
    #[serde(rename = "S")]
    SoftClip,
    #[serde(rename = "H")]
    HardClip,
    #[serde(rename = "P")]
    Pad,
    #[serde(rename = "=")]
    SequenceMatch,
    #[serde(rename = "X")]
    SequenceMismatch,
}

impl CigarKind {
    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'M' => CigarKind::Match,
            'I' => CigarKind::Insertion,
            'D' => CigarKind::Deletion,
            'N' => CigarKind::Skip,
            'S' => CigarKind::SoftClip,
            'H' => CigarKind::HardClip,
            'P' => CigarKind::Pad,
            '=' => CigarKind::SequenceMatch,
            'X' => CigarKind::SequenceMismatch,
            _ => return None,
        })
    }

    pub fn code(&self) -> char {
        match self {
            CigarKind::Match => 'M',
            CigarKind::Insertion => 'I',
            CigarKind::Deletion => 'D',
            CigarKind::Skip => 'N',
            CigarKind::SoftClip => 'S',
            CigarKind::HardClip => 'H',
            CigarKind::Pad => 'P',
            CigarKind::SequenceMatch => '=',
            CigarKind::SequenceMismatch => 'X',
        }
    }

    pub fn consumes_reference(&self) -> bool {
        matches!(
            self,
            CigarKind::Match
                | CigarKind::Deletion
                | CigarKind::Skip
                | CigarKind::SequenceMatch
                | CigarKind::SequenceMismatch
        )
    }

    pub fn consumes_read(&self) -> bool {
        matches!(
            self,
            CigarKind::Match
                | CigarKind::Insertion
                | CigarKind::SoftClip
                | CigarKind::SequenceMatch
                | CigarKind::SequenceMismatch
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: u64,
}

impl CigarOp {
    pub fn new(kind: CigarKind, len: u64) -> Self {
        Self { kind, len }
    }
}

/// Parse a SAM CIGAR string such as `10M2I5M`. `*` is an empty CIGAR.
pub fn parse_cigar(s: &str) -> Result<Vec<CigarOp>> {
    if s == "*" {
        return Ok(Vec::new());
    }

    let mut ops = Vec::new();
    let mut len: Option<u64> = None;
    for c in s.chars() {
        if let Some(digit) = c.to_digit(10) {
            len = Some(len.unwrap_or(0) * 10 + digit as u64);
            continue;
        }
        let kind = CigarKind::from_code(c)
            .ok_or_else(|| Error::InvalidInput(format!("invalid CIGAR op '{}' in {}", c, s)))?;
        let n = len
            .take()
            .ok_or_else(|| Error::InvalidInput(format!("missing CIGAR length in {}", s)))?;
        ops.push(CigarOp::new(kind, n));
    }

    if len.is_some() {
        return Err(Error::InvalidInput(format!("trailing CIGAR length in {}", s)));
    }
    Ok(ops)
}

pub struct CigarString<'a>(pub &'a [CigarOp]);

impl fmt::Display for CigarString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "*");
        }
        for op in self.0 {
            write!(f, "{}{}", op.len, op.kind.code())?;
        }
        Ok(())
    }
}

/// Reference span covered by a CIGAR.
pub fn reference_span(cigar: &[CigarOp]) -> u64 {
    cigar
        .iter()
        .filter(|op| op.kind.consumes_reference())
        .map(|op| op.len)
        .sum()
}

/// A mapped read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment {
    pub name: String,
    #[serde(rename = "referenceName")]
    pub sequence_name: String,
    pub start: u64,
    pub end: u64,
    #[serde(rename = "mappingQuality")]
    pub mapping_quality: Option<u8>,
    pub flags: u16,
    #[serde(serialize_with = "serialize_cigar")]
    pub cigar: Vec<CigarOp>,
    pub sequence: String,
}

fn serialize_cigar<S: serde::Serializer>(
    cigar: &[CigarOp],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&CigarString(cigar))
}

impl GenomicRecord for Alignment {
    fn region(&self) -> GenomicInterval {
        GenomicInterval {
            sequence_name: self.sequence_name.clone(),
            start: self.start,
            end: self.end,
        }
    }

    fn with_sequence_name(mut self, name: &str) -> Self {
        self.sequence_name = name.to_string();
        self
    }

    fn footprint(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.name.len()
            + self.sequence_name.len()
            + self.sequence.len()
            + self.cigar.len() * std::mem::size_of::<CigarOp>()
    }
}

/// A variant site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    #[serde(rename = "referenceName")]
    pub sequence_name: String,
    pub start: u64,
    pub end: u64,
    pub ids: Vec<String>,
    #[serde(rename = "referenceBases")]
    pub reference_bases: String,
    #[serde(rename = "alternateBases")]
    pub alternate_bases: Vec<String>,
}

impl GenomicRecord for Variant {
    fn region(&self) -> GenomicInterval {
        GenomicInterval {
            sequence_name: self.sequence_name.clone(),
            start: self.start,
            end: self.end,
        }
    }

    fn with_sequence_name(mut self, name: &str) -> Self {
        self.sequence_name = name.to_string();
        self
    }

    fn footprint(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.sequence_name.len()
            + self.reference_bases.len()
            + self.ids.iter().map(String::len).sum::<usize>()
            + self.alternate_bases.iter().map(String::len).sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
    #[serde(rename = ".")]
    Unknown,
}

impl Strand {
    pub fn from_bed(s: &str) -> Self {
        match s {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            _ => Strand::Unknown,
        }
    }
}

/// An annotation feature, e.g. a BED interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "referenceName")]
    pub sequence_name: String,
    pub start: u64,
    pub end: u64,
    pub name: Option<String>,
    pub score: Option<f64>,
    pub strand: Strand,
}

impl GenomicRecord for Feature {
    fn region(&self) -> GenomicInterval {
        GenomicInterval {
            sequence_name: self.sequence_name.clone(),
            start: self.start,
            end: self.end,
        }
    }

    fn with_sequence_name(mut self, name: &str) -> Self {
        self.sequence_name = name.to_string();
        self
    }

    fn footprint(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.sequence_name.len()
            + self.name.as_ref().map_or(0, String::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cigar() {
        let ops = parse_cigar("3S10M2I5M1D4M").unwrap();
        assert_eq!(ops.len(), 6);
        assert_eq!(ops[0], CigarOp::new(CigarKind::SoftClip, 3));
        assert_eq!(ops[2], CigarOp::new(CigarKind::Insertion, 2));
        assert_eq!(reference_span(&ops), 20);
        assert_eq!(CigarString(&ops).to_string(), "3S10M2I5M1D4M");
    }

    #[test]
    fn test_parse_cigar_star() {
        assert!(parse_cigar("*").unwrap().is_empty());
        assert_eq!(CigarString(&[]).to_string(), "*");
    }

    #[test]
    fn test_parse_cigar_errors() {
        assert!(parse_cigar("M").is_err());
        assert!(parse_cigar("10Q").is_err());
        assert!(parse_cigar("10M5").is_err());
    }

    #[test]
    fn test_alignment_rename_keeps_coordinates() {
        let alignment = Alignment {
            name: "r1".to_string(),
            sequence_name: "chr1".to_string(),
            start: 10,
            end: 20,
            mapping_quality: Some(60),
            flags: 0x10,
            cigar: parse_cigar("10M").unwrap(),
            sequence: "ACGTACGTAC".to_string(),
        };
        let renamed = alignment.clone().with_sequence_name("1");
        assert_eq!(renamed.region(), GenomicInterval::new("1", 10, 20).unwrap());
        assert!(renamed.footprint() > std::mem::size_of::<Alignment>());
    }

    #[test]
    fn test_alignment_serializes_cigar_string() {
        let alignment = Alignment {
            name: "r1".to_string(),
            sequence_name: "chr1".to_string(),
            start: 0,
            end: 5,
            mapping_quality: None,
            flags: 0,
            cigar: parse_cigar("2M1I3M").unwrap(),
            sequence: "ACGTAC".to_string(),
        };
        let json = serde_json::to_value(&alignment).unwrap();
        assert_eq!(json["cigar"], "2M1I3M");
        assert_eq!(json["referenceName"], "chr1");
    }

    #[test]
    fn test_strand_from_bed() {
        assert_eq!(Strand::from_bed("+"), Strand::Forward);
        assert_eq!(Strand::from_bed("-"), Strand::Reverse);
        assert_eq!(Strand::from_bed("."), Strand::Unknown);
    }
}
