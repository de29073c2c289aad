//! CSV output sink

use crate::extract::{RecordField, ValidatedRecord};
use crate::output::{RecordSink, SinkError, SinkResult};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Writes one CSV row per accepted record, flushing after each row
pub struct CsvSink {
    writer: csv::Writer<File>,

    /// Keys of the rows found at open time plus those written since
    keys: HashSet<String>,
}

impl CsvSink {
    /// Opens the CSV file at `path`
    ///
    /// With `append` set, an existing non-empty file keeps its rows and its
    /// header; otherwise the file is truncated and a fresh header written.
    /// Keys of the rows present before opening are read first either way.
    pub fn open(path: &Path, append: bool) -> SinkResult<Self> {
        let keys = read_keys(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Could not read keys from existing CSV output");
            HashSet::new()
        });
        let has_rows = std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
        let keep_existing = append && has_rows;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(keep_existing)
            .truncate(!keep_existing)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.display().to_string(),
                source,
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if keep_existing {
            tracing::info!(path = %path.display(), "Appending to existing CSV output");
        } else {
            writer.write_record(RecordField::columns())?;
            writer.flush()?;
            tracing::info!(path = %path.display(), "Created CSV output");
        }

        Ok(Self { writer, keys })
    }
}

impl RecordSink for CsvSink {
    fn write(&mut self, record: &ValidatedRecord) -> SinkResult<()> {
        self.writer.write_record(record.to_row())?;
        self.writer.flush()?;
        self.keys.insert(record.dedup_key().to_string());
        Ok(())
    }

    fn known_keys(&mut self) -> SinkResult<HashSet<String>> {
        Ok(self.keys.clone())
    }
}

/// Reads the deduplication keys of the rows in an existing CSV file
///
/// The house id is the key; rows without one fall back to the detail URL.
pub fn read_keys(path: &Path) -> SinkResult<HashSet<String>> {
    let mut keys = HashSet::new();
    if !path.exists() {
        return Ok(keys);
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let position = |field: RecordField| headers.iter().position(|h| h == field.column());
    let id_column = position(RecordField::HouseId);
    let url_column = position(RecordField::DetailUrl);

    for row in reader.records() {
        let row = row?;
        let key = id_column
            .and_then(|i| row.get(i))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .or_else(|| url_column.and_then(|i| row.get(i)).map(str::trim))
            .filter(|key| !key.is_empty());

        if let Some(key) = key {
            keys.insert(key.to_string());
        }
    }

    Ok(keys)
}
