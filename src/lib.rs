//! Anjuke-Harvest: a resilient rental-listing crawler
//!
//! This crate walks the paginated rental catalog of one listing site, visits
//! every listing's detail page one at a time, extracts a fixed set of fields,
//! validates them against configured bounds, and appends accepted records to
//! a durable sink.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Errors that stop a crawl before it can begin
///
/// Per-page and per-record problems never surface here; they are counted in
/// [`state::CrawlState`] and the run carries on.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser session error: {0}")]
    Session(#[from] browser::SessionError),

    #[error("Output sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Invalid region slug: {0:?}")]
    InvalidRegion(String),
}

/// Result type alias for crawl-level operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator};
pub use extract::{RawRecord, ValidatedRecord};
pub use output::CrawlSummary;
pub use state::{CatalogPageRef, CrawlState};
