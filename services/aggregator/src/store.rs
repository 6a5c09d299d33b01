//! Record sinks
//!
//! A [`ProfileSink`] receives every reduced record. [`JsonLinesStore`]
//! persists them as one JSON-lines file per record kind:
//!
//! ```text
//! <output_dir>/<collection>_BookTickerMinutes.jsonl
//! <output_dir>/<collection>_TradeTickerMinutes.jsonl
//! <output_dir>/<collection>_OrderBookMinutes.jsonl
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::events::{AggregateRecord, RecordKind};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record in {path} line {line}: {reason}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Destination for reduced records.
pub trait ProfileSink {
    fn write(&mut self, record: &AggregateRecord) -> Result<(), SinkError>;

    /// Make every written record durable.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps records in memory, in write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<AggregateRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[AggregateRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<AggregateRecord> {
        self.records
    }
}

impl ProfileSink for MemorySink {
    fn write(&mut self, record: &AggregateRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// File-backed store with one collection file per record kind.
pub struct JsonLinesStore {
    writers: BTreeMap<RecordKind, BufWriter<File>>,
    records_written: u64,
}

impl JsonLinesStore {
    /// Open (or create) the collection files under `dir`.
    ///
    /// With `drop_existing`, previous contents are discarded; otherwise new
    /// records are appended.
    pub fn open(dir: &Path, collection: &str, drop_existing: bool) -> Result<Self, SinkError> {
        fs::create_dir_all(dir)?;

        let mut writers = BTreeMap::new();
        for &kind in RecordKind::all() {
            let path = collection_path(dir, collection, kind);
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(!drop_existing)
                .truncate(drop_existing)
                .open(&path)?;
            writers.insert(kind, BufWriter::new(file));
        }

        info!(
            dir = %dir.display(),
            collection,
            drop_existing,
            "JsonLinesStore opened"
        );

        Ok(Self {
            writers,
            records_written: 0,
        })
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Read every stored record back, grouped by kind in file order.
    pub fn load(dir: &Path, collection: &str) -> Result<Vec<AggregateRecord>, SinkError> {
        let mut records = Vec::new();
        for &kind in RecordKind::all() {
            let path = collection_path(dir, collection, kind);
            if !path.exists() {
                debug!(path = %path.display(), "Collection file missing, skipping");
                continue;
            }

            let reader = BufReader::new(File::open(&path)?);
            for (index, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: AggregateRecord =
                    serde_json::from_str(&line).map_err(|e| SinkError::Corrupt {
                        path: path.clone(),
                        line: index + 1,
                        reason: e.to_string(),
                    })?;
                if record.kind() != kind {
                    return Err(SinkError::Corrupt {
                        path: path.clone(),
                        line: index + 1,
                        reason: format!("{:?} record in {:?} collection", record.kind(), kind),
                    });
                }
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl ProfileSink for JsonLinesStore {
    fn write(&mut self, record: &AggregateRecord) -> Result<(), SinkError> {
        if let Some(writer) = self.writers.get_mut(&record.kind()) {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            self.records_written += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Path of the collection file for `kind`.
pub fn collection_path(dir: &Path, collection: &str, kind: RecordKind) -> PathBuf {
    dir.join(format!("{}_{}.jsonl", collection, kind.collection_suffix()))
}
