//! CSV log of verification challenges

use crate::output::{ChallengeOutcome, CrawlEvent, CrawlReporter, SinkError, SinkResult};
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

const HEADER: [&str; 5] = ["timestamp", "url", "outcome", "attempts", "duration_secs"];

/// Appends one row per finished challenge to a CSV file
///
/// Write errors are logged once and otherwise ignored; a broken log never
/// stops the crawl.
pub struct VerificationLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    failed: bool,
}

impl VerificationLog {
    /// Opens `path` for appending, writing the header if the file is new
    pub fn open(path: &Path) -> SinkResult<Self> {
        let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.display().to_string(),
                source,
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            failed: false,
        })
    }

    fn append(&mut self, url: &str, outcome: &str, attempts: u32, duration_secs: f64) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let attempts = attempts.to_string();
        let duration = format!("{:.2}", duration_secs);
        let result = self
            .writer
            .write_record([
                timestamp.as_str(),
                url,
                outcome,
                attempts.as_str(),
                duration.as_str(),
            ])
            .map_err(SinkError::from)
            .and_then(|_| self.writer.flush().map_err(SinkError::from));

        if let Err(e) = result {
            if !self.failed {
                tracing::warn!(path = %self.path.display(), error = %e, "Verification log write failed");
                self.failed = true;
            }
        }
    }
}

impl CrawlReporter for VerificationLog {
    fn report(&mut self, event: &CrawlEvent<'_>) {
        match event {
            CrawlEvent::ChallengeFinished {
                url,
                outcome,
                attempts,
                elapsed,
            } => {
                let label = match outcome {
                    ChallengeOutcome::Unresolved => "FAILED",
                    _ => "SUCCESS",
                };
                self.append(url, label, *attempts, elapsed.as_secs_f64());
            }
            CrawlEvent::ManualInterventionRequired { url, .. } => {
                self.append(url, "MANUAL", 0, 0.0);
            }
            _ => {}
        }
    }
}
