use super::{SourceFiles, same_sequence};
use crate::engine::{GenomicRecord, Loader};
use crate::interval::GenomicInterval;
use crate::records::{Feature, Strand};
use crate::{Error, Result};
use async_trait::async_trait;
use tokio::fs;

/// Reads features from plain-text BED files by scanning the whole file.
pub struct BedLoader {
    files: SourceFiles,
}

impl BedLoader {
    pub fn new(files: SourceFiles) -> Self {
        Self { files }
    }
}

#[async_trait]
impl Loader<Feature> for BedLoader {
    async fn load(&self, key: &str, interval: &GenomicInterval) -> Result<Vec<Feature>> {
        let path = self.files.path(key)?;
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| Error::load(key, interval, e))?;

        let mut features = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let Some(feature) =
                parse_line(line).map_err(|e| Error::load(key, interval, format!("line {}: {}", lineno + 1, e)))?
            else {
                continue;
            };
            if !same_sequence(&feature.sequence_name, &interval.sequence_name) {
                continue;
            }
            let feature = feature.with_sequence_name(&interval.sequence_name);
            if feature.region().overlaps(interval) {
                features.push(feature);
            }
        }

        tracing::debug!("{} features from {:?} at {}", features.len(), path, interval);
        Ok(features)
    }
}

/// Parse one BED line. Blank, comment, `track` and `browser` lines yield `None`.
fn parse_line(line: &str) -> std::result::Result<Option<Feature>, String> {
    let line = line.trim_end();
    if line.is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
    {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Err(format!("expected at least 3 columns, got {}", fields.len()));
    }

    let start: u64 = fields[1]
        .parse()
        .map_err(|_| format!("invalid start: {}", fields[1]))?;
    let end: u64 = fields[2]
        .parse()
        .map_err(|_| format!("invalid end: {}", fields[2]))?;
    if start > end {
        return Err(format!("start {} after end {}", start, end));
    }

    let name = fields
        .get(3)
        .filter(|name| **name != ".")
        .map(|name| name.to_string());
    let score = match fields.get(4) {
        Some(&".") | None => None,
        Some(score) => Some(
            score
                .parse::<f64>()
                .map_err(|_| format!("invalid score: {}", score))?,
        ),
    };
    let strand = fields
        .get(5)
        .map(|s| Strand::from_bed(s))
        .unwrap_or(Strand::Unknown);

    Ok(Some(Feature {
        sequence_name: fields[0].to_string(),
        start,
        end,
        name,
        score,
        strand,
    }))
}
