use std::path::PathBuf;

/// A snapshot of memory use against a capacity, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySample {
    pub used: u64,
    pub capacity: u64,
}

impl MemorySample {
    /// True when `used` is strictly above `fraction × capacity`.
    pub fn exceeds(&self, fraction: f64) -> bool {
        self.used as f64 > fraction * self.capacity as f64
    }
}

/// Source of the memory-pressure signal checked before every request.
pub trait MemoryProbe: Send + Sync {
    /// `cached_bytes` is the engine's own estimate of what it holds.
    fn sample(&self, cached_bytes: u64) -> MemorySample;
}

/// Measures only what the engine itself has cached against a fixed budget.
#[derive(Debug, Clone, Copy)]
pub struct CacheBudget {
    pub capacity: u64,
}

impl CacheBudget {
    pub fn new(capacity: u64) -> Self {
        Self { capacity }
    }
}

impl MemoryProbe for CacheBudget {
    fn sample(&self, cached_bytes: u64) -> MemorySample {
        MemorySample {
            used: cached_bytes,
            capacity: self.capacity,
        }
    }
}

/// Measures whole-host memory from `/proc/meminfo`.
///
/// Hosts without a readable meminfo report zero usage, which never triggers
/// eviction.
#[derive(Debug, Clone)]
pub struct SystemMemory {
    meminfo: PathBuf,
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self {
            meminfo: PathBuf::from("/proc/meminfo"),
        }
    }
}

impl SystemMemory {
    pub fn with_path(meminfo: PathBuf) -> Self {
        Self { meminfo }
    }
}

impl MemoryProbe for SystemMemory {
    fn sample(&self, _cached_bytes: u64) -> MemorySample {
        match std::fs::read_to_string(&self.meminfo) {
            Ok(text) => parse_meminfo(&text),
            Err(e) => {
                tracing::debug!("cannot read {:?}: {}", self.meminfo, e);
                MemorySample {
                    used: 0,
                    capacity: 0,
                }
            }
        }
    }
}

fn parse_meminfo(text: &str) -> MemorySample {
    let mut total = None;
    let mut available = None;

    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let (Some(label), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Ok(kib) = value.parse::<u64>() else {
            continue;
        };
        match label {
            "MemTotal:" => total = Some(kib * 1024),
            "MemAvailable:" => available = Some(kib * 1024),
            _ => {}
        }
    }

    match (total, available) {
        (Some(total), Some(available)) => MemorySample {
            used: total.saturating_sub(available),
            capacity: total,
        },
        _ => MemorySample {
            used: 0,
            capacity: 0,
        },
    }
}
