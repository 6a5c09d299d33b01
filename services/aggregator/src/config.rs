//! Aggregator configuration
//!
//! Loaded from a JSON file. Only `collection` and `input` are required:
//!
//! ```json
//! {
//!   "collection": "BTCUSDT",
//!   "input": "data/BTCUSDT.jsonl",
//!   "output_dir": "out",
//!   "max_depth": 1000,
//!   "percentage_interval": "0.01",
//!   "near_buckets": 5,
//!   "progress_every": 1000
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_depth() -> usize {
    1000
}

fn default_percentage_interval() -> Decimal {
    Decimal::new(1, 2)
}

fn default_near_buckets() -> usize {
    5
}

fn default_progress_every() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Base name of the output collections.
    pub collection: String,
    /// JSON-lines feed to aggregate.
    pub input: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Levels kept per side of the book.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Bucket width as a fraction of the midpoint.
    #[serde(default = "default_percentage_interval")]
    pub percentage_interval: Decimal,
    /// Buckets summed into the wide-band CSV columns.
    #[serde(default = "default_near_buckets")]
    pub near_buckets: usize,
    /// Log progress every N documents; 0 disables.
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

impl AggregatorConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("collection must not be empty".into()));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        if self.percentage_interval <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "percentage_interval must be positive, got {}",
                self.percentage_interval
            )));
        }
        if self.near_buckets == 0 {
            return Err(ConfigError::Invalid("near_buckets must be at least 1".into()));
        }
        Ok(())
    }
}
