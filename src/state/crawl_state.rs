use crate::state::CatalogPageRef;
use std::fmt;

/// Why a page or record did not make it to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Navigation ran out of attempts
    Navigation,

    /// Link discovery could not read a loaded catalog page
    Discovery,

    /// A required field was missing on the detail page
    Extraction,

    /// Price or area fell outside the configured bounds
    Validation,

    /// The sink refused the write
    Sink,
}

impl FailureKind {
    pub const ALL: [FailureKind; 5] = [
        Self::Navigation,
        Self::Discovery,
        Self::Extraction,
        Self::Validation,
        Self::Sink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Discovery => "discovery",
            Self::Extraction => "extraction",
            Self::Validation => "validation",
            Self::Sink => "sink",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Run-scoped progress of one crawl
///
/// Created at session start and owned by the coordinator, which is the only
/// writer. Never persisted: a rerun starts from zero.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    accepted: u64,
    pages_visited: u64,
    failures: u64,
    duplicates: u64,
    navigation_failures: u64,
    discovery_failures: u64,
    extraction_failures: u64,
    validation_failures: u64,
    sink_failures: u64,
    cursor: Option<CatalogPageRef>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a record that reached the sink
    pub fn record_accepted(&mut self) {
        self.accepted += 1;
    }

    /// Records a catalog page that loaded successfully
    pub fn record_page_visited(&mut self) {
        self.pages_visited += 1;
    }

    /// Records one failure; every kind adds exactly one to the total
    pub fn record_failure(&mut self, kind: FailureKind) {
        self.failures += 1;
        match kind {
            FailureKind::Navigation => self.navigation_failures += 1,
            FailureKind::Discovery => self.discovery_failures += 1,
            FailureKind::Extraction => self.extraction_failures += 1,
            FailureKind::Validation => self.validation_failures += 1,
            FailureKind::Sink => self.sink_failures += 1,
        }
    }

    /// Records a listing skipped because it already exists in the output
    pub fn record_duplicate(&mut self) {
        self.duplicates += 1;
    }

    pub fn set_cursor(&mut self, page: CatalogPageRef) {
        self.cursor = Some(page);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn pages_visited(&self) -> u64 {
        self.pages_visited
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Failures of one kind
    pub fn failures_of(&self, kind: FailureKind) -> u64 {
        match kind {
            FailureKind::Navigation => self.navigation_failures,
            FailureKind::Discovery => self.discovery_failures,
            FailureKind::Extraction => self.extraction_failures,
            FailureKind::Validation => self.validation_failures,
            FailureKind::Sink => self.sink_failures,
        }
    }

    /// The catalog page currently being processed
    pub fn cursor(&self) -> Option<&CatalogPageRef> {
        self.cursor.as_ref()
    }

    /// Returns true once `ceiling` records have been accepted
    pub fn reached(&self, ceiling: u64) -> bool {
        self.accepted >= ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_zeroed() {
        let state = CrawlState::new();
        assert_eq!(state.accepted(), 0);
        assert_eq!(state.pages_visited(), 0);
        assert_eq!(state.failures(), 0);
        assert!(state.cursor().is_none());
    }

    #[test]
    fn test_failures_add_one_to_total() {
        let mut state = CrawlState::new();
        state.record_failure(FailureKind::Navigation);
        state.record_failure(FailureKind::Validation);
        state.record_failure(FailureKind::Validation);

        assert_eq!(state.failures(), 3);
        assert_eq!(state.failures_of(FailureKind::Navigation), 1);
        assert_eq!(state.failures_of(FailureKind::Validation), 2);
        assert_eq!(state.failures_of(FailureKind::Extraction), 0);
    }

    #[test]
    fn test_duplicates_are_not_failures() {
        let mut state = CrawlState::new();
        state.record_duplicate();
        assert_eq!(state.duplicates(), 1);
        assert_eq!(state.failures(), 0);
    }

    #[test]
    fn test_reached_ceiling() {
        let mut state = CrawlState::new();
        assert!(!state.reached(1));
        state.record_accepted();
        assert!(state.reached(1));
        assert!(!state.reached(2));
    }

    #[test]
    fn test_cursor() {
        let mut state = CrawlState::new();
        state.set_cursor(CatalogPageRef::new(Some("beijing".to_string()), 2));
        assert_eq!(state.cursor().unwrap().page(), 2);
        assert_eq!(state.cursor().unwrap().region(), Some("beijing"));
    }
}
