//! Lazy materialization engine.
//!
//! The engine answers "all records overlapping this interval" for any number
//! of data sources (keys), loading from the backing store only the parts of a
//! request not already held in memory.
//!
//! # Request pipeline
//!
//! 1. The region is validated and its sequence name mapped onto the
//!    dictionary's own spelling, normalizing the `chr` prefix when needed.
//! 2. The memory probe is sampled; above the configured fraction, every key's
//!    coverage and cached records are dropped.
//! 3. The uncovered parts of the region are computed from the key's
//!    [`CoverageSet`] and handed to the [`Loader`] one at a time.
//! 4. Loaded records and the newly covered parts are committed together, only
//!    once every part has loaded.
//! 5. Cached records overlapping the region are returned, renamed to the
//!    caller's own sequence name.
//!
//! # Locking
//!
//! Each key has its own mutex, held from the coverage check through the
//! commit, so two requests for the same key never load the same range twice.
//! A global gate (`RwLock`) is held shared by requests and exclusively by
//! eviction, so a clear never interleaves with a commit.

mod memory;

pub use memory::{CacheBudget, MemoryProbe, MemorySample, SystemMemory};

use crate::coverage::CoverageSet;
use crate::dictionary::SequenceDictionary;
use crate::interval::{GenomicInterval, normalize_name};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Bytes charged per stored coverage range.
const COVERAGE_RANGE_BYTES: u64 = std::mem::size_of::<(u64, u64)>() as u64;

/// What the engine needs to know about a record type.
pub trait GenomicRecord: Clone + Send + Sync + 'static {
    /// The interval the record occupies.
    fn region(&self) -> GenomicInterval;

    /// The same record on a differently named sequence.
    fn with_sequence_name(self, name: &str) -> Self;

    /// Approximate in-memory size, used for cache accounting.
    fn footprint(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

/// Reads records for one data source from the backing store.
///
/// Implementations must return every record overlapping `interval`.
#[async_trait]
pub trait Loader<T>: Send + Sync {
    async fn load(&self, key: &str, interval: &GenomicInterval) -> Result<Vec<T>>;
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Data-source keys served by this engine.
    pub keys: Vec<String>,
    /// Eviction threshold as a fraction of the probe's capacity, in `(0, 1]`.
    pub fraction: f64,
}

struct KeyState<T> {
    coverage: CoverageSet,
    records: HashMap<String, Vec<T>>,
    bytes: u64,
}

impl<T> Default for KeyState<T> {
    fn default() -> Self {
        Self {
            coverage: CoverageSet::new(),
            records: HashMap::new(),
            bytes: 0,
        }
    }
}

impl<T> KeyState<T> {
    fn clear(&mut self) -> u64 {
        self.coverage.clear();
        self.records.clear();
        std::mem::take(&mut self.bytes)
    }
}

pub struct MaterializationEngine<T> {
    dictionary: Arc<SequenceDictionary>,
    loader: Arc<dyn Loader<T>>,
    probe: Arc<dyn MemoryProbe>,
    fraction: f64,
    gate: RwLock<()>,
    slots: HashMap<String, Mutex<KeyState<T>>>,
    cached_bytes: AtomicU64,
}

impl<T: GenomicRecord> MaterializationEngine<T> {
    pub fn new(
        config: EngineConfig,
        dictionary: Arc<SequenceDictionary>,
        loader: Arc<dyn Loader<T>>,
        probe: Arc<dyn MemoryProbe>,
    ) -> Result<Self> {
        if !(config.fraction > 0.0 && config.fraction <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "memory fraction must be in (0, 1], got {}",
                config.fraction
            )));
        }

        let mut slots = HashMap::with_capacity(config.keys.len());
        for key in config.keys {
            if slots.contains_key(&key) {
                return Err(Error::InvalidInput(format!("duplicate data source key: {}", key)));
            }
            slots.insert(key, Mutex::new(KeyState::default()));
        }

        Ok(Self {
            dictionary,
            loader,
            probe,
            fraction: config.fraction,
            gate: RwLock::new(()),
            slots,
            cached_bytes: AtomicU64::new(0),
        })
    }

    pub fn dictionary(&self) -> &SequenceDictionary {
        &self.dictionary
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.slots.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Estimated bytes currently held across all keys.
    pub fn cached_bytes(&self) -> u64 {
        self.cached_bytes.load(Ordering::Acquire)
    }

    /// All records for `key` overlapping `region`, loading whatever part of
    /// the region has not been materialized yet.
    #[tracing::instrument(level = "debug", skip(self, region), fields(region = %region))]
    pub async fn get(&self, key: &str, region: &GenomicInterval) -> Result<Vec<T>> {
        let slot = self.slot(key)?;
        let normalized = self.resolve(region)?;

        self.evict_if_pressured().await;

        let _gate = self.gate.read().await;
        let mut state = slot.lock().await;

        // A zero-length request still needs the base at `start` materialized.
        let span = if normalized.is_empty() {
            GenomicInterval {
                end: normalized.start.saturating_add(1),
                ..normalized.clone()
            }
        } else {
            normalized.clone()
        };
        let parts = state.coverage.uncovered_parts(&span);
        if !parts.is_empty() {
            let loaded = self.load_parts(key, &state.coverage, &parts).await?;

            let mut added = parts.len() as u64 * COVERAGE_RANGE_BYTES;
            let bucket = state
                .records
                .entry(normalized.sequence_name.clone())
                .or_default();
            for record in loaded {
                added += record.footprint() as u64;
                bucket.push(record);
            }
            for part in &parts {
                state.coverage.insert(part);
            }
            state.bytes += added;
            self.cached_bytes.fetch_add(added, Ordering::AcqRel);
        } else {
            tracing::debug!("{} fully cached for {}", normalized, key);
        }

        let mut hits: Vec<T> = state
            .records
            .get(&normalized.sequence_name)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|record| record.region().overlaps(&normalized))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(state);

        hits.sort_by_key(|record| record.region().start);
        if region.sequence_name != normalized.sequence_name {
            hits = hits
                .into_iter()
                .map(|record| record.with_sequence_name(&region.sequence_name))
                .collect();
        }
        Ok(hits)
    }

    /// True if `interval` is already materialized for `key`. The interval is
    /// normalized first, like a request would be.
    pub async fn is_covered(&self, key: &str, interval: &GenomicInterval) -> Result<bool> {
        let slot = self.slot(key)?;
        let normalized = interval.with_sequence_name(self.catalog_name(&interval.sequence_name));
        let _gate = self.gate.read().await;
        let covered = slot.lock().await.coverage.is_covered(&normalized);
        Ok(covered)
    }

    /// The materialized ranges for `key` on one sequence, in dictionary naming.
    pub async fn covered_intervals(
        &self,
        key: &str,
        sequence_name: &str,
    ) -> Result<Vec<GenomicInterval>> {
        let slot = self.slot(key)?;
        let name = self.catalog_name(sequence_name);
        let _gate = self.gate.read().await;
        let intervals = slot.lock().await.coverage.intervals(&name);
        Ok(intervals)
    }

    /// Drop every key's coverage and cached records.
    pub async fn clear(&self) {
        let _gate = self.gate.write().await;
        self.clear_all().await;
    }

    fn slot(&self, key: &str) -> Result<&Mutex<KeyState<T>>> {
        self.slots
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("data source: {}", key)))
    }

    /// Catalog spelling of `name`, or its normalized form when uncatalogued.
    fn catalog_name(&self, name: &str) -> String {
        self.dictionary
            .canonical_name(name)
            .map(str::to_string)
            .unwrap_or_else(|| normalize_name(name, self.dictionary.convention()))
    }

    fn resolve(&self, region: &GenomicInterval) -> Result<GenomicInterval> {
        if region.start > region.end {
            return Err(Error::InvalidRegion(format!("{} has start after end", region)));
        }
        let record = self.dictionary.resolve(&region.sequence_name).ok_or_else(|| {
            Error::InvalidRegion(format!("unknown sequence: {}", region.sequence_name))
        })?;
        if region.start > record.length {
            return Err(Error::InvalidRegion(format!(
                "{} starts past the end of {} ({} bases)",
                region, record.name, record.length
            )));
        }
        Ok(region.with_sequence_name(record.name.as_str()))
    }

    async fn evict_if_pressured(&self) {
        if !self.probe.sample(self.cached_bytes()).exceeds(self.fraction) {
            return;
        }

        let _gate = self.gate.write().await;
        // Another request may have cleared while we waited for the gate.
        let sample = self.probe.sample(self.cached_bytes());
        if sample.exceeds(self.fraction) {
            let freed = self.clear_all().await;
            tracing::info!(
                used = sample.used,
                capacity = sample.capacity,
                freed,
                "memory threshold exceeded, evicted all cached regions"
            );
        }
    }

    /// Caller must hold the gate exclusively.
    async fn clear_all(&self) -> u64 {
        let mut freed = 0;
        for slot in self.slots.values() {
            freed += slot.lock().await.clear();
        }
        self.cached_bytes.store(0, Ordering::Release);
        freed
    }

    /// Load every part, keeping each record once: a record is dropped if it
    /// overlaps a range covered before this request (it was loaded then) or an
    /// earlier part of this request.
    async fn load_parts(
        &self,
        key: &str,
        prior: &CoverageSet,
        parts: &[GenomicInterval],
    ) -> Result<Vec<T>> {
        let mut kept = Vec::new();

        for (i, part) in parts.iter().enumerate() {
            tracing::debug!("loading {} for {}", part, key);
            let records = self.loader.load(key, part).await.map_err(|e| {
                tracing::warn!("load of {} for {} failed: {}", part, key, e);
                match e {
                    Error::Load { .. } => e,
                    other => Error::load(key, part, other),
                }
            })?;

            let before = kept.len();
            for record in records {
                let record = if record.region().sequence_name != part.sequence_name {
                    record.with_sequence_name(&part.sequence_name)
                } else {
                    record
                };
                let span = record.region();
                if !span.overlaps(part)
                    || prior.overlaps_any(&span)
                    || parts[..i].iter().any(|earlier| earlier.overlaps(&span))
                {
                    continue;
                }
                kept.push(record);
            }
            tracing::debug!("{} new records from {}", kept.len() - before, part);
        }

        Ok(kept)
    }
}
