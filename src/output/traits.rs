//! Output sink trait and errors

use crate::extract::ValidatedRecord;
use crate::output::CrawlSummary;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur while persisting records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to open output {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Durable destination for accepted records
///
/// Records arrive one at a time in discovery order; `write` returns only
/// once the record is persisted.
pub trait RecordSink: Send {
    /// Persists one record
    fn write(&mut self, record: &ValidatedRecord) -> SinkResult<()>;

    /// Deduplication keys of the records already stored
    fn known_keys(&mut self) -> SinkResult<HashSet<String>>;

    /// Called once after the run with its final counts
    fn finish(&mut self, _summary: &CrawlSummary) -> SinkResult<()> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write(&mut self, record: &ValidatedRecord) -> SinkResult<()> {
        (**self).write(record)
    }

    fn known_keys(&mut self) -> SinkResult<HashSet<String>> {
        (**self).known_keys()
    }

    fn finish(&mut self, summary: &CrawlSummary) -> SinkResult<()> {
        (**self).finish(summary)
    }
}

/// In-memory sink for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemorySink {
    pub records: Vec<ValidatedRecord>,
    pub preexisting: HashSet<String>,
    pub fail_writes: bool,
    pub finished: Option<CrawlSummary>,
}

#[cfg(test)]
impl RecordSink for MemorySink {
    fn write(&mut self, record: &ValidatedRecord) -> SinkResult<()> {
        if self.fail_writes {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn known_keys(&mut self) -> SinkResult<HashSet<String>> {
        Ok(self.preexisting.clone())
    }

    fn finish(&mut self, summary: &CrawlSummary) -> SinkResult<()> {
        self.finished = Some(summary.clone());
        Ok(())
    }
}
