pub mod config;
pub mod coverage;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod formats;
pub mod handlers;
pub mod interval;
pub mod mismatch;
pub mod records;
pub mod reference;
pub mod types;

pub use config::Config;
pub use engine::{GenomicRecord, Loader, MaterializationEngine};
pub use error::{Error, Result};
pub use interval::GenomicInterval;
