//! Crawler module for catalog walking and listing collection
//!
//! This module contains the core crawling logic, including:
//! - Guarded navigation with retries, pacing and challenge handling
//! - Detail-link discovery on catalog pages
//! - Overall crawl coordination

mod coordinator;
mod discovery;
mod guard;

pub use coordinator::{run_crawl, run_detail_urls, Coordinator};
pub use discovery::{discover_links, DetailLinkSet, DiscoveryError};
pub use guard::{
    detect_challenge, ChallengeSignal, GuardSettings, NavOutcome, NavigationError,
    NavigationGuard,
};
