use crate::dictionary::SequenceDictionary;
use crate::engine::{
    CacheBudget, EngineConfig, GenomicRecord, Loader, MaterializationEngine, MemoryProbe,
    SystemMemory,
};
use crate::formats::{BamLoader, BedLoader, SourceFiles, VcfLoader};
use crate::handlers::AppState;
use crate::reference::ReferenceReader;
use crate::{Error, Result};
use clap::{Parser, ValueEnum};
use noodles::bam;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MemorySource {
    /// Bytes held by the cache against --cache-capacity
    Cache,
    /// Host memory from /proc/meminfo
    System,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "materializr")]
#[command(about = "Genome browser backend with lazy region materialization")]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "MATERIALIZR_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "MATERIALIZR_PORT", default_value = "8080")]
    pub port: u16,

    /// Indexed reference FASTA (expects <path>.fai)
    #[arg(long, env = "MATERIALIZR_REFERENCE")]
    pub reference: Option<PathBuf>,

    /// Indexed BAM files, served under their file stem
    #[arg(long, env = "MATERIALIZR_READS", value_delimiter = ',')]
    pub reads: Vec<PathBuf>,

    /// Tabix-indexed .vcf.gz files
    #[arg(long, env = "MATERIALIZR_VARIANTS", value_delimiter = ',')]
    pub variants: Vec<PathBuf>,

    /// BED files
    #[arg(long, env = "MATERIALIZR_FEATURES", value_delimiter = ',')]
    pub features: Vec<PathBuf>,

    /// Evict all cached regions when memory use exceeds this fraction of capacity
    #[arg(long, env = "MATERIALIZR_CACHE_FRACTION", default_value = "0.5")]
    pub cache_fraction: f64,

    /// Cache capacity in bytes (with --memory-source cache)
    #[arg(long, env = "MATERIALIZR_CACHE_CAPACITY", default_value = "1073741824")]
    pub cache_capacity: u64,

    /// What the eviction check measures
    #[arg(long, env = "MATERIALIZR_MEMORY_SOURCE", value_enum, default_value = "cache")]
    pub memory_source: MemorySource,

    /// Widest region a single request may ask for, in bases
    #[arg(long, env = "MATERIALIZR_MAX_REGION", default_value = "1000000")]
    pub max_region_length: u64,

    /// Enable CORS for all origins
    #[arg(long, env = "MATERIALIZR_CORS", default_value = "true")]
    pub cors: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(self.cache_fraction > 0.0 && self.cache_fraction <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "--cache-fraction must be in (0, 1], got {}",
                self.cache_fraction
            )));
        }
        if self.reads.is_empty() && self.variants.is_empty() && self.features.is_empty() {
            return Err(Error::InvalidInput(
                "no data files given (use --reads, --variants or --features)".to_string(),
            ));
        }
        if self.reference.is_none() && self.reads.is_empty() {
            return Err(Error::InvalidInput(
                "a sequence dictionary needs --reference or at least one --reads file".to_string(),
            ));
        }
        Ok(())
    }

    pub fn memory_probe(&self) -> Arc<dyn MemoryProbe> {
        match self.memory_source {
            MemorySource::Cache => Arc::new(CacheBudget::new(self.cache_capacity)),
            MemorySource::System => Arc::new(SystemMemory::default()),
        }
    }

    /// Open the reference, derive the dictionary and build one engine per
    /// configured data type.
    pub fn app_state(&self) -> Result<AppState> {
        self.validate()?;

        let reference = self
            .reference
            .as_deref()
            .map(ReferenceReader::open)
            .transpose()?
            .map(Arc::new);

        let dictionary = match (&reference, self.reads.first()) {
            (Some(reader), _) => reader.dictionary(),
            (None, Some(bam_path)) => Arc::new(dictionary_from_bam(bam_path)?),
            (None, None) => {
                return Err(Error::InvalidInput(
                    "no source for the sequence dictionary".to_string(),
                ));
            }
        };
        tracing::info!(
            "Sequence dictionary: {} sequences, {:?} naming",
            dictionary.len(),
            dictionary.convention()
        );

        let probe = self.memory_probe();

        let reads = self.engine(&self.reads, &dictionary, &probe, BamLoader::new)?;
        let variants = self.engine(&self.variants, &dictionary, &probe, VcfLoader::new)?;
        let features = self.engine(&self.features, &dictionary, &probe, BedLoader::new)?;

        Ok(AppState {
            dictionary,
            reads,
            variants,
            features,
            reference,
            max_region_length: self.max_region_length,
        })
    }

    fn engine<T, L>(
        &self,
        paths: &[PathBuf],
        dictionary: &Arc<SequenceDictionary>,
        probe: &Arc<dyn MemoryProbe>,
        make_loader: impl FnOnce(SourceFiles) -> L,
    ) -> Result<Option<Arc<MaterializationEngine<T>>>>
    where
        T: GenomicRecord,
        L: Loader<T> + 'static,
    {
        if paths.is_empty() {
            return Ok(None);
        }

        let files = SourceFiles::from_paths(paths)?;
        let keys = files.keys();
        tracing::info!("Serving {}", keys.join(", "));

        let engine = MaterializationEngine::new(
            EngineConfig {
                keys,
                fraction: self.cache_fraction,
            },
            dictionary.clone(),
            Arc::new(make_loader(files)),
            probe.clone(),
        )?;
        Ok(Some(Arc::new(engine)))
    }
}

fn dictionary_from_bam(path: &Path) -> Result<SequenceDictionary> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::InvalidInput(format!("failed to open {:?}: {}", path, e)))?;
    let mut reader = bam::io::Reader::new(file);
    let header = reader
        .read_header()
        .map_err(|e| Error::InvalidInput(format!("failed to read BAM header {:?}: {}", path, e)))?;
    SequenceDictionary::from_sam_header(&header)
}
