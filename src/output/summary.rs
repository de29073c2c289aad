//! End-of-run summary

use crate::state::{CrawlState, FailureKind};
use chrono::{DateTime, Local};
use std::fmt;
use std::time::Duration;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Every region (or every given URL) was worked through
    #[default]
    Exhausted,

    /// The accepted-record ceiling was reached
    RecordCeiling,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Exhausted => "exhausted",
            StopReason::RecordCeiling => "record_ceiling",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final counts of a run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSummary {
    pub accepted: u64,
    pub failures: u64,
    pub duplicates: u64,
    pub pages_visited: u64,

    /// Failure counts per kind, in [`FailureKind::ALL`] order
    pub failures_by_kind: Vec<(FailureKind, u64)>,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}

impl CrawlSummary {
    pub fn from_state(
        state: &CrawlState,
        stop_reason: StopReason,
        started_at: DateTime<Local>,
        elapsed: Duration,
    ) -> Self {
        Self {
            accepted: state.accepted(),
            failures: state.failures(),
            duplicates: state.duplicates(),
            pages_visited: state.pages_visited(),
            failures_by_kind: FailureKind::ALL
                .iter()
                .map(|kind| (*kind, state.failures_of(*kind)))
                .collect(),
            stop_reason,
            started_at,
            elapsed,
        }
    }

    /// Records attempted: accepted plus failed
    pub fn attempted(&self) -> u64 {
        self.accepted + self.failures
    }
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} accepted, {} failed, {} duplicates, {} catalog pages in {:.1}s ({})",
            self.accepted,
            self.failures,
            self.duplicates,
            self.pages_visited,
            self.elapsed.as_secs_f64(),
            self.stop_reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_state() {
        let mut state = CrawlState::new();
        state.record_accepted();
        state.record_accepted();
        state.record_failure(FailureKind::Extraction);
        state.record_duplicate();
        state.record_page_visited();

        let summary = CrawlSummary::from_state(
            &state,
            StopReason::RecordCeiling,
            Local::now(),
            Duration::from_millis(1500),
        );

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.attempted(), 3);
        assert!(summary
            .failures_by_kind
            .contains(&(FailureKind::Extraction, 1)));
        assert_eq!(
            summary.to_string(),
            "2 accepted, 1 failed, 1 duplicates, 1 catalog pages in 1.5s (record_ceiling)"
        );
    }
}
