//! Dataset sinks.
//!
//! Both sinks render the whole dataset in memory, write it to a sibling temp
//! file, then rename it into place, so a failed run never leaves a truncated
//! dataset behind.

use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, info};

use schoolscrape_shared::{Record, Result, ScrapeError, Schema};

/// Destination for a finished dataset.
pub trait RecordSink {
    /// Write `records` with columns in `schema` order.
    fn write(&self, records: &[Record], schema: &Schema) -> Result<()>;

    /// Where the dataset ends up.
    fn path(&self) -> &Path;
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Tabular output: one header row, one row per record.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for CsvSink {
    fn write(&self, records: &[Record], schema: &Schema) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(schema.headers())
            .map_err(|e| ScrapeError::Serialization(format!("CSV header: {e}")))?;

        for record in records {
            writer
                .write_record(schema.columns().iter().map(|c| record.get(c.key)))
                .map_err(|e| ScrapeError::Serialization(format!("CSV row '{}': {e}", record.name)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ScrapeError::Serialization(format!("CSV flush: {e}")))?;

        write_atomic(&self.path, &bytes)?;
        info!(path = %self.path.display(), rows = records.len(), "wrote CSV dataset");
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Pretty-printed JSON array with object keys in schema order.
#[derive(Debug, Clone)]
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for JsonSink {
    fn write(&self, records: &[Record], schema: &Schema) -> Result<()> {
        let rows: Vec<OrderedRecord<'_>> = records
            .iter()
            .map(|record| OrderedRecord { record, schema })
            .collect();
        let mut json = serde_json::to_string_pretty(&rows)
            .map_err(|e| ScrapeError::Serialization(format!("JSON: {e}")))?;
        json.push('\n');

        write_atomic(&self.path, json.as_bytes())?;
        info!(path = %self.path.display(), records = records.len(), "wrote JSON dataset");
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// A record serialized as a map in column order.
struct OrderedRecord<'a> {
    record: &'a Record,
    schema: &'a Schema,
}

impl Serialize for OrderedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let columns = self.schema.columns();
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for column in columns {
            map.serialize_entry(column.key.as_str(), self.record.get(column.key))?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Atomic write
// ---------------------------------------------------------------------------

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ScrapeError::io(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes).map_err(|e| ScrapeError::io(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(ScrapeError::io(path, e));
    }
    debug!(path = %path.display(), bytes = bytes.len(), "replaced file");
    Ok(())
}
