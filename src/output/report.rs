//! Crawl progress events and their reporters
//!
//! The crawler emits a [`CrawlEvent`] for everything worth telling a human
//! about. Reporters render or record events; they never fail the crawl.

use crate::output::CrawlSummary;
use crate::state::{CatalogPageRef, FailureKind};
use std::time::Duration;

/// How a verification challenge ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// Cleared by the scripted action
    Resolved,

    /// Cleared while waiting for manual intervention
    ResolvedManually,

    /// Still present after every attempt
    Unresolved,
}

impl ChallengeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeOutcome::Resolved => "resolved",
            ChallengeOutcome::ResolvedManually => "resolved_manually",
            ChallengeOutcome::Unresolved => "unresolved",
        }
    }
}

/// Something that happened during a crawl
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    RunStarted {
        regions: usize,
        max_total: u64,
    },
    PageStarted {
        page: &'a CatalogPageRef,
    },
    PageLoaded {
        page: &'a CatalogPageRef,
        links: usize,
    },
    PageFailed {
        page: &'a CatalogPageRef,
        reason: &'a str,
    },
    /// A catalog page yielded no detail links
    RegionExhausted {
        page: &'a CatalogPageRef,
    },
    RecordAccepted {
        url: &'a str,
        title: &'a str,
        price: u32,
        total: u64,
    },
    RecordRejected {
        url: &'a str,
        kind: FailureKind,
        reason: &'a str,
    },
    DuplicateSkipped {
        url: &'a str,
        key: &'a str,
    },
    NavigationRetry {
        url: &'a str,
        attempt: u32,
        max_attempts: u32,
        error: &'a str,
    },
    NavigationExhausted {
        url: &'a str,
        attempts: u32,
        error: &'a str,
    },
    ChallengeDetected {
        url: &'a str,
        signal: &'a str,
    },
    ChallengeFinished {
        url: &'a str,
        outcome: ChallengeOutcome,
        attempts: u32,
        elapsed: Duration,
    },
    ManualInterventionRequired {
        url: &'a str,
        wait: Duration,
    },
    RunFinished {
        summary: &'a CrawlSummary,
    },
}

/// Receives crawl events
pub trait CrawlReporter: Send {
    fn report(&mut self, event: &CrawlEvent<'_>);
}

/// Renders events as `tracing` log lines
#[derive(Debug, Clone)]
pub struct TracingReporter {
    show_progress: bool,
}

impl TracingReporter {
    /// `show_progress` promotes per-record lines from debug to info
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }
}

impl CrawlReporter for TracingReporter {
    fn report(&mut self, event: &CrawlEvent<'_>) {
        match event {
            CrawlEvent::RunStarted { regions, max_total } => {
                tracing::info!(regions, max_total, "Crawl started");
            }
            CrawlEvent::PageStarted { page } => {
                tracing::info!(page = %page, "Crawling catalog page");
            }
            CrawlEvent::PageLoaded { page, links } => {
                tracing::info!(page = %page, links, "Catalog page loaded");
            }
            CrawlEvent::PageFailed { page, reason } => {
                tracing::warn!(page = %page, reason, "Catalog page failed");
            }
            CrawlEvent::RegionExhausted { page } => {
                tracing::info!(page = %page, "No listings on page, region done");
            }
            CrawlEvent::RecordAccepted {
                url,
                title,
                price,
                total,
            } => {
                if self.show_progress {
                    tracing::info!(total, price, title, url, "Record saved");
                } else {
                    tracing::debug!(total, price, title, url, "Record saved");
                }
            }
            CrawlEvent::RecordRejected { url, kind, reason } => {
                tracing::warn!(url, kind = %kind, reason, "Record rejected");
            }
            CrawlEvent::DuplicateSkipped { url, key } => {
                tracing::debug!(url, key, "Duplicate listing skipped");
            }
            CrawlEvent::NavigationRetry {
                url,
                attempt,
                max_attempts,
                error,
            } => {
                tracing::warn!(url, attempt, max_attempts, error, "Navigation failed, retrying");
            }
            CrawlEvent::NavigationExhausted {
                url,
                attempts,
                error,
            } => {
                tracing::error!(url, attempts, error, "Navigation gave up");
            }
            CrawlEvent::ChallengeDetected { url, signal } => {
                tracing::warn!(url, signal, "Verification challenge detected");
            }
            CrawlEvent::ChallengeFinished {
                url,
                outcome,
                attempts,
                elapsed,
            } => match outcome {
                ChallengeOutcome::Unresolved => tracing::error!(
                    url,
                    attempts,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "Verification challenge unresolved"
                ),
                _ => tracing::info!(
                    url,
                    outcome = outcome.as_str(),
                    attempts,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "Verification challenge cleared"
                ),
            },
            CrawlEvent::ManualInterventionRequired { url, wait } => {
                tracing::warn!(
                    url,
                    wait_secs = wait.as_secs(),
                    "Manual verification required, solve the challenge in the browser"
                );
            }
            CrawlEvent::RunFinished { summary } => {
                tracing::info!(
                    accepted = summary.accepted,
                    failures = summary.failures,
                    duplicates = summary.duplicates,
                    pages = summary.pages_visited,
                    stop_reason = %summary.stop_reason,
                    elapsed_secs = summary.elapsed.as_secs_f64(),
                    "Crawl finished"
                );
            }
        }
    }
}

/// Forwards every event to each contained reporter in order
#[derive(Default)]
pub struct ReporterSet {
    reporters: Vec<Box<dyn CrawlReporter>>,
}

impl ReporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: impl CrawlReporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl CrawlReporter for ReporterSet {
    fn report(&mut self, event: &CrawlEvent<'_>) {
        for reporter in &mut self.reporters {
            reporter.report(event);
        }
    }
}

/// Keeps a copy of every event for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    pub events: Vec<String>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn count(&self, prefix: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(prefix)).count()
    }
}

#[cfg(test)]
impl CrawlReporter for RecordingReporter {
    fn report(&mut self, event: &CrawlEvent<'_>) {
        self.events.push(format!("{:?}", event));
    }
}
