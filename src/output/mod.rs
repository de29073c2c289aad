//! Output module: durable sinks and crawl reporting
//!
//! This module handles:
//! - Persisting accepted records (`CsvSink`, or `storage::SqliteSink`)
//! - Deduplication against previously stored listings
//! - Progress events rendered as log lines or appended to a verification log
//! - The end-of-run summary

mod csv_sink;
mod dedup;
mod report;
mod summary;
mod traits;
mod verification_log;

pub use csv_sink::{read_keys, CsvSink};
pub use dedup::DuplicateChecker;
pub use report::{ChallengeOutcome, CrawlEvent, CrawlReporter, ReporterSet, TracingReporter};
pub use summary::{CrawlSummary, StopReason};
pub use traits::{RecordSink, SinkError, SinkResult};
pub use verification_log::VerificationLog;

#[cfg(test)]
pub(crate) use report::RecordingReporter;
#[cfg(test)]
pub(crate) use traits::MemorySink;

use crate::config::{OutputConfig, OutputFormat};
use crate::storage::SqliteSink;
use std::path::Path;

/// Opens the sink selected by the output configuration
///
/// `config_hash` is stored with the run row of SQLite outputs.
pub fn open_sink(config: &OutputConfig, config_hash: &str) -> SinkResult<Box<dyn RecordSink>> {
    let path = Path::new(&config.path);
    match config.format {
        OutputFormat::Csv => Ok(Box::new(CsvSink::open(path, config.append)?)),
        OutputFormat::Sqlite => Ok(Box::new(SqliteSink::open(path, config_hash)?)),
    }
}

/// Builds the reporters requested by the output configuration
pub fn build_reporters(config: &OutputConfig) -> SinkResult<ReporterSet> {
    let mut reporters = ReporterSet::new().with(TracingReporter::new(config.show_progress));
    if let Some(path) = &config.verification_log {
        reporters = reporters.with(VerificationLog::open(Path::new(path))?);
    }
    Ok(reporters)
}
