//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the pieces together:
//! - Walking regions and catalog pages in order
//! - Guarded navigation of catalog and detail pages
//! - Extraction, deduplication, validation and persistence of each listing
//! - Counting every outcome and stopping at the configured ceilings

use crate::browser::{BrowserSession, HttpSession, StealthProfile};
use crate::config::Config;
use crate::crawler::discovery::discover_links;
use crate::crawler::guard::{GuardSettings, NavOutcome, NavigationGuard};
use crate::extract::{extract, validate, ValidationBounds};
use crate::output::{
    build_reporters, open_sink, CrawlEvent, CrawlReporter, CrawlSummary, DuplicateChecker,
    RecordSink, StopReason,
};
use crate::state::{CatalogPageRef, CrawlState, FailureKind};
use crate::{HarvestError, UrlError};
use chrono::Local;
use std::time::{Duration, Instant};
use url::Url;

/// Whether the walk goes on after a page or a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    RegionExhausted,
    CeilingReached,
}

/// Main crawler coordinator structure
///
/// Owns the crawl state, the navigation guard, the sink and the reporter
/// for the duration of one run. The browser session is lent to `run`.
pub struct Coordinator<K: RecordSink, R: CrawlReporter> {
    config: Config,
    base_url: Url,
    guard: NavigationGuard,
    bounds: ValidationBounds,
    sink: K,
    reporter: R,
    dedup: Option<DuplicateChecker>,
    state: CrawlState,
}

impl<K: RecordSink, R: CrawlReporter> Coordinator<K, R> {
    /// Creates a new coordinator instance
    ///
    /// Fails if the catalog base URL does not parse.
    pub fn new(config: Config, sink: K, reporter: R) -> Result<Self, HarvestError> {
        let base_url =
            Url::parse(&config.crawl.base_url).map_err(|e| UrlError::Parse(e.to_string()))?;
        let guard = NavigationGuard::new(
            GuardSettings::from_config(&config),
            StealthProfile::from_config(&config.anti_detection),
        );
        let bounds = ValidationBounds::from_config(&config.validation);

        Ok(Self {
            config,
            base_url,
            guard,
            bounds,
            sink,
            reporter,
            dedup: None,
            state: CrawlState::new(),
        })
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Walks every region's catalog and closes the session afterwards
    pub async fn run<S>(&mut self, session: &mut S) -> CrawlSummary
    where
        S: BrowserSession + ?Sized,
    {
        let started_at = Local::now();
        let clock = Instant::now();
        self.begin();

        let stop = self.walk_catalog(session).await;

        close_session(session).await;
        self.finish(stop, started_at, clock.elapsed())
    }

    /// Crawls an explicit list of detail pages and closes the session
    /// afterwards
    pub async fn run_urls<S>(&mut self, session: &mut S, urls: &[Url]) -> CrawlSummary
    where
        S: BrowserSession + ?Sized,
    {
        let started_at = Local::now();
        let clock = Instant::now();
        self.begin();

        let mut stop = StopReason::Exhausted;
        for url in urls {
            if self.process_listing(session, url).await == Flow::CeilingReached {
                stop = StopReason::RecordCeiling;
                break;
            }
        }

        close_session(session).await;
        self.finish(stop, started_at, clock.elapsed())
    }

    fn begin(&mut self) {
        self.state = CrawlState::new();

        if self.config.output.dedup {
            let known = match self.sink.known_keys() {
                Ok(keys) => keys,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not read existing output, deduplication starts empty");
                    Default::default()
                }
            };
            tracing::info!(known = known.len(), "Deduplication enabled");
            self.dedup = Some(DuplicateChecker::new(known));
        } else {
            self.dedup = None;
        }

        let regions = self.config.crawl.region_slots().len();
        self.reporter.report(&CrawlEvent::RunStarted {
            regions,
            max_total: self.config.crawl.max_total_houses,
        });
    }

    async fn walk_catalog<S>(&mut self, session: &mut S) -> StopReason
    where
        S: BrowserSession + ?Sized,
    {
        let max_pages = self.config.crawl.max_pages;
        let page_interval = Duration::from_millis(self.config.pacing.page_interval_ms);

        for region in self.config.crawl.region_slots() {
            for page_no in 1..=max_pages {
                let page_ref = CatalogPageRef::new(region.clone(), page_no);
                self.state.set_cursor(page_ref.clone());

                match self.crawl_catalog_page(session, &page_ref).await {
                    Flow::Continue => {}
                    Flow::RegionExhausted => break,
                    Flow::CeilingReached => return StopReason::RecordCeiling,
                }

                if !page_interval.is_zero() && page_no < max_pages {
                    tokio::time::sleep(page_interval).await;
                }
            }
        }

        StopReason::Exhausted
    }

    async fn crawl_catalog_page<S>(&mut self, session: &mut S, page_ref: &CatalogPageRef) -> Flow
    where
        S: BrowserSession + ?Sized,
    {
        self.reporter
            .report(&CrawlEvent::PageStarted { page: page_ref });

        let url = match page_ref.url(&self.base_url) {
            Ok(url) => url,
            Err(e) => {
                self.page_failed(page_ref, FailureKind::Discovery, &e.to_string());
                return Flow::Continue;
            }
        };

        let page = match self
            .guard
            .safe_navigate(session, &url, &mut self.reporter)
            .await
        {
            NavOutcome::Success(page) => page,
            NavOutcome::ExhaustedRetries { last_error, .. } => {
                self.page_failed(page_ref, FailureKind::Navigation, &last_error.to_string());
                return Flow::Continue;
            }
        };
        self.state.record_page_visited();

        let links = match discover_links(
            &self.base_url,
            page_ref,
            &page,
            self.config.crawl.max_houses_per_page,
        ) {
            Ok(links) => links,
            Err(e) => {
                self.page_failed(page_ref, FailureKind::Discovery, &e.to_string());
                return Flow::Continue;
            }
        };

        if links.is_empty() {
            self.reporter
                .report(&CrawlEvent::RegionExhausted { page: page_ref });
            return Flow::RegionExhausted;
        }

        self.reporter.report(&CrawlEvent::PageLoaded {
            page: page_ref,
            links: links.len(),
        });

        for link in &links {
            if self.process_listing(session, link).await == Flow::CeilingReached {
                return Flow::CeilingReached;
            }
        }

        Flow::Continue
    }

    /// Navigate, extract, deduplicate, validate and persist one listing
    async fn process_listing<S>(&mut self, session: &mut S, url: &Url) -> Flow
    where
        S: BrowserSession + ?Sized,
    {
        let page = match self
            .guard
            .safe_navigate(session, url, &mut self.reporter)
            .await
        {
            NavOutcome::Success(page) => page,
            NavOutcome::ExhaustedRetries { last_error, .. } => {
                self.reject(url, FailureKind::Navigation, &last_error.to_string());
                return Flow::Continue;
            }
        };

        let record = match extract(&page) {
            Ok(record) => record,
            Err(e) => {
                self.reject(url, FailureKind::Extraction, &e.to_string());
                return Flow::Continue;
            }
        };

        let key = record.dedup_key().to_string();
        if self
            .dedup
            .as_ref()
            .is_some_and(|checker| checker.is_duplicate(&key))
        {
            self.state.record_duplicate();
            self.reporter.report(&CrawlEvent::DuplicateSkipped {
                url: url.as_str(),
                key: &key,
            });
            return Flow::Continue;
        }

        let validated = match validate(record, &self.bounds) {
            Ok(validated) => validated,
            Err(e) => {
                self.reject(url, FailureKind::Validation, &e.to_string());
                return Flow::Continue;
            }
        };

        if let Err(e) = self.sink.write(&validated) {
            self.reject(url, FailureKind::Sink, &e.to_string());
            return Flow::Continue;
        }

        self.state.record_accepted();
        if let Some(checker) = self.dedup.as_mut() {
            checker.insert(&key);
        }
        self.reporter.report(&CrawlEvent::RecordAccepted {
            url: url.as_str(),
            title: &validated.title,
            price: validated.price,
            total: self.state.accepted(),
        });

        if self.state.reached(self.config.crawl.max_total_houses) {
            Flow::CeilingReached
        } else {
            Flow::Continue
        }
    }

    fn page_failed(&mut self, page_ref: &CatalogPageRef, kind: FailureKind, reason: &str) {
        self.state.record_failure(kind);
        self.reporter.report(&CrawlEvent::PageFailed {
            page: page_ref,
            reason,
        });
    }

    fn reject(&mut self, url: &Url, kind: FailureKind, reason: &str) {
        self.state.record_failure(kind);
        self.reporter.report(&CrawlEvent::RecordRejected {
            url: url.as_str(),
            kind,
            reason,
        });
    }

    fn finish(
        &mut self,
        stop: StopReason,
        started_at: chrono::DateTime<Local>,
        elapsed: Duration,
    ) -> CrawlSummary {
        let summary = CrawlSummary::from_state(&self.state, stop, started_at, elapsed);

        if let Err(e) = self.sink.finish(&summary) {
            tracing::warn!(error = %e, "Failed to finalize output");
        }
        self.reporter
            .report(&CrawlEvent::RunFinished { summary: &summary });

        summary
    }
}

async fn close_session<S>(session: &mut S)
where
    S: BrowserSession + ?Sized,
{
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Failed to close browser session");
    }
}

/// Runs a complete catalog crawl
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the output sink and reporters
/// 2. Launch the browser session
/// 3. Walk all regions and pages
/// 4. Close the session and return the summary
///
/// Only start-up problems are returned as errors; everything after the
/// session is up ends in the summary's counters.
pub async fn run_crawl(config: &Config, config_hash: &str) -> Result<CrawlSummary, HarvestError> {
    let (mut coordinator, mut session) = prepare(config, config_hash)?;
    Ok(coordinator.run(&mut session).await)
}

/// Runs the per-listing pipeline over explicit detail URLs
pub async fn run_detail_urls(
    config: &Config,
    config_hash: &str,
    urls: &[Url],
) -> Result<CrawlSummary, HarvestError> {
    let (mut coordinator, mut session) = prepare(config, config_hash)?;
    Ok(coordinator.run_urls(&mut session, urls).await)
}

type LiveCoordinator = Coordinator<Box<dyn RecordSink>, crate::output::ReporterSet>;

fn prepare(config: &Config, config_hash: &str) -> Result<(LiveCoordinator, HttpSession), HarvestError> {
    let sink = open_sink(&config.output, config_hash)?;
    let reporters = build_reporters(&config.output)?;
    let coordinator = Coordinator::new(config.clone(), sink, reporters)?;

    let identity = StealthProfile::from_config(&config.anti_detection).next_identity();
    let session = HttpSession::launch(&identity, config.pacing.timeout())?;

    Ok((coordinator, session))
}
