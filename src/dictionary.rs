//! Sequence dictionary: the authoritative catalog of sequence names and
//! lengths, and the chromosome naming convention those names follow.

use crate::interval::{self, NamingConvention};
use crate::{Error, Result};
use indexmap::IndexMap;
use noodles::fasta::fai;
use noodles::sam;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceRecord {
    pub name: String,
    pub length: u64,
}

#[derive(Debug, Clone)]
pub struct SequenceDictionary {
    records: IndexMap<String, SequenceRecord>,
    convention: NamingConvention,
}

impl SequenceDictionary {
    /// Build a dictionary, inferring the naming convention from its names.
    pub fn new(records: impl IntoIterator<Item = SequenceRecord>) -> Result<Self> {
        let mut map = IndexMap::new();
        for record in records {
            if map.contains_key(&record.name) {
                return Err(Error::InvalidInput(format!(
                    "duplicate sequence name: {}",
                    record.name
                )));
            }
            map.insert(record.name.clone(), record);
        }

        // Prefixed when at least half the catalog carries `chr`.
        let prefixed = map
            .keys()
            .filter(|name| interval::has_chr_prefix(name))
            .count();
        let convention = if !map.is_empty() && prefixed * 2 >= map.len() {
            NamingConvention::Prefixed
        } else {
            NamingConvention::Unprefixed
        };

        Ok(Self {
            records: map,
            convention,
        })
    }

    /// Read the dictionary from a FASTA index (`.fai`).
    pub fn from_fai_path(path: &Path) -> Result<Self> {
        let index = fai::read(path).map_err(|e| {
            Error::InvalidInput(format!("failed to read FAI index {:?}: {}", path, e))
        })?;
        Self::from_fai_index(&index)
    }

    pub fn from_fai_index(index: &fai::Index) -> Result<Self> {
        Self::new(index.as_ref().iter().map(|record| SequenceRecord {
            name: String::from_utf8_lossy(record.name()).into_owned(),
            length: record.length() as u64,
        }))
    }

    /// Build the dictionary from the `@SQ` lines of an alignment header.
    pub fn from_sam_header(header: &sam::Header) -> Result<Self> {
        Self::new(
            header
                .reference_sequences()
                .iter()
                .map(|(name, reference_sequence)| SequenceRecord {
                    name: name.to_string(),
                    length: usize::from(reference_sequence.length()) as u64,
                }),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SequenceRecord> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceRecord> {
        self.records.values()
    }

    pub fn convention(&self) -> NamingConvention {
        self.convention
    }

    pub fn has_chr_prefix(&self) -> bool {
        self.convention == NamingConvention::Prefixed
    }

    /// The catalog's own spelling of `name`: the name itself when catalogued,
    /// otherwise its normalized form when that is catalogued.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        if let Some((catalogued, _)) = self.records.get_key_value(name) {
            return Some(catalogued.as_str());
        }
        let normalized = interval::normalize_name(name, self.convention);
        self.records
            .get_key_value(&normalized)
            .map(|(catalogued, _)| catalogued.as_str())
    }

    /// Look up a caller-supplied sequence name in either naming convention.
    pub fn resolve(&self, name: &str) -> Option<&SequenceRecord> {
        self.canonical_name(name).and_then(|name| self.get(name))
    }
}
