//! Mismatch and indel extraction by walking an alignment's CIGAR against the
//! reference.
//!
//! This is a pure per-record transform used when rendering reads; it holds no
//! state and performs no caching.

use crate::interval::GenomicInterval;
use crate::records::{Alignment, CigarKind};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MismatchKind {
    #[serde(rename = "M")]
    Mismatch,
    #[serde(rename = "I")]
    Insertion,
    #[serde(rename = "D")]
    Deletion,
    #[serde(rename = "N")]
    Skip,
}

/// One difference between a read and the reference.
///
/// `ref_position` is where the event sits on the reference; `start..end`
/// indexes the read bases involved (empty for deletions and skips).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub op: MismatchKind,
    #[serde(rename = "refPosition")]
    pub ref_position: u64,
    pub start: u64,
    pub end: u64,
    pub sequence: String,
    #[serde(rename = "refBase")]
    pub ref_base: String,
}

/// Reference bases for `window`, addressed by reference coordinate.
struct ReferenceWindow<'a> {
    bases: &'a [u8],
    window: &'a GenomicInterval,
}

impl ReferenceWindow<'_> {
    fn base(&self, position: u64) -> Option<u8> {
        if position < self.window.start || position >= self.window.end {
            return None;
        }
        self.bases.get((position - self.window.start) as usize).copied()
    }

    fn span(&self, start: u64, end: u64) -> String {
        (start..end)
            .filter_map(|p| self.base(p))
            .map(|b| b as char)
            .collect()
    }

    fn touches(&self, start: u64, end: u64) -> bool {
        start < self.window.end && self.window.start < end.max(start + 1)
    }
}

/// Walk `alignment`'s CIGAR and report every mismatch, insertion, deletion
/// and skip that falls inside `window`. `reference` holds the bases of
/// `window`.
pub fn extract(alignment: &Alignment, reference: &str, window: &GenomicInterval) -> Vec<Mismatch> {
    let reference = ReferenceWindow {
        bases: reference.as_bytes(),
        window,
    };
    let read = alignment.sequence.as_bytes();
    let has_bases = alignment.sequence != "*";

    let mut mismatches = Vec::new();
    let mut ref_pos = alignment.start;
    let mut read_pos: u64 = 0;

    for op in &alignment.cigar {
        match op.kind {
            CigarKind::Match | CigarKind::SequenceMatch | CigarKind::SequenceMismatch => {
                if has_bases {
                    for k in 0..op.len {
                        let (Some(ref_base), Some(&read_base)) = (
                            reference.base(ref_pos + k),
                            read.get((read_pos + k) as usize),
                        ) else {
                            continue;
                        };
                        if !ref_base.eq_ignore_ascii_case(&read_base) {
                            mismatches.push(Mismatch {
                                op: MismatchKind::Mismatch,
                                ref_position: ref_pos + k,
                                start: read_pos + k,
                                end: read_pos + k + 1,
                                sequence: (read_base as char).to_string(),
                                ref_base: (ref_base as char).to_string(),
                            });
                        }
                    }
                }
            }
            CigarKind::Insertion => {
                if reference.touches(ref_pos, ref_pos) {
                    let from = (read_pos as usize).min(read.len());
                    let to = ((read_pos + op.len) as usize).min(read.len());
                    mismatches.push(Mismatch {
                        op: MismatchKind::Insertion,
                        ref_position: ref_pos,
                        start: read_pos,
                        end: read_pos + op.len,
                        sequence: String::from_utf8_lossy(&read[from..to]).into_owned(),
                        ref_base: String::new(),
                    });
                }
            }
            CigarKind::Deletion | CigarKind::Skip => {
                let end = ref_pos + op.len;
                if reference.touches(ref_pos, end) {
                    let (kind, ref_base) = if op.kind == CigarKind::Deletion {
                        (MismatchKind::Deletion, reference.span(ref_pos, end))
                    } else {
                        (MismatchKind::Skip, String::new())
                    };
                    mismatches.push(Mismatch {
                        op: kind,
                        ref_position: ref_pos,
                        start: read_pos,
                        end: read_pos,
                        sequence: String::new(),
                        ref_base,
                    });
                }
            }
            CigarKind::SoftClip | CigarKind::HardClip | CigarKind::Pad => {}
        }

        if op.kind.consumes_reference() {
            ref_pos += op.len;
        }
        if op.kind.consumes_read() {
            read_pos += op.len;
        }
    }

    mismatches
}
