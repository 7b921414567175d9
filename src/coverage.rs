//! Coverage bookkeeping for one data source.
//!
//! Each sequence maps to a sorted list of `[start, end)` ranges. The list is
//! kept disjoint and non-adjacent: every insert merges with any range it
//! overlaps or touches.

use crate::interval::GenomicInterval;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct CoverageSet {
    ranges: HashMap<String, Vec<(u64, u64)>>,
}

impl CoverageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// True if `interval` lies entirely inside the stored union.
    pub fn is_covered(&self, interval: &GenomicInterval) -> bool {
        self.uncovered_parts(interval).is_empty()
    }

    /// The ordered sub-intervals of `interval` not yet covered.
    pub fn uncovered_parts(&self, interval: &GenomicInterval) -> Vec<GenomicInterval> {
        if interval.is_empty() {
            return Vec::new();
        }

        let Some(ranges) = self.ranges.get(&interval.sequence_name) else {
            return vec![interval.clone()];
        };

        let mut parts = Vec::new();
        let mut cursor = interval.start;

        // First range that could end after the query start.
        let first = ranges.partition_point(|&(_, end)| end <= interval.start);
        for &(start, end) in &ranges[first..] {
            if start >= interval.end {
                break;
            }
            if start > cursor {
                parts.push(interval_on(interval, cursor, start));
            }
            cursor = cursor.max(end);
            if cursor >= interval.end {
                break;
            }
        }

        if cursor < interval.end {
            parts.push(interval_on(interval, cursor, interval.end));
        }
        parts
    }

    /// True if any stored range overlaps `interval` (point semantics for
    /// zero-length intervals, matching [`GenomicInterval::overlaps`]).
    pub fn overlaps_any(&self, interval: &GenomicInterval) -> bool {
        let Some(ranges) = self.ranges.get(&interval.sequence_name) else {
            return false;
        };
        let end = interval.end.max(interval.start.saturating_add(1));
        let first = ranges.partition_point(|&(_, e)| e <= interval.start);
        ranges
            .get(first)
            .is_some_and(|&(start, _)| start < end)
    }

    /// Add `interval`, merging it with every overlapping or adjacent range.
    pub fn insert(&mut self, interval: &GenomicInterval) {
        if interval.is_empty() {
            return;
        }

        let ranges = self
            .ranges
            .entry(interval.sequence_name.clone())
            .or_default();

        // Ranges touching [start, end] inclusive get absorbed.
        let lo = ranges.partition_point(|&(_, end)| end < interval.start);
        let hi = ranges.partition_point(|&(start, _)| start <= interval.end);

        let mut merged = (interval.start, interval.end);
        if lo < hi {
            merged.0 = merged.0.min(ranges[lo].0);
            merged.1 = merged.1.max(ranges[hi - 1].1);
        }
        ranges.splice(lo..hi, std::iter::once(merged));
    }

    /// Stored ranges for one sequence, in order.
    pub fn intervals(&self, sequence_name: &str) -> Vec<GenomicInterval> {
        self.ranges
            .get(sequence_name)
            .map(|ranges| {
                ranges
                    .iter()
                    .map(|&(start, end)| GenomicInterval {
                        sequence_name: sequence_name.to_string(),
                        start,
                        end,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}

fn interval_on(template: &GenomicInterval, start: u64, end: u64) -> GenomicInterval {
    GenomicInterval {
        sequence_name: template.sequence_name.clone(),
        start,
        end,
    }
}
