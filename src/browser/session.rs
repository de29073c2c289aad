//! Session trait and page types

use async_trait::async_trait;
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors raised by a browser session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to launch browser session: {0}")]
    Launch(String),

    #[error("Invalid proxy {proxy}: {message}")]
    Proxy { proxy: String, message: String },

    #[error("Navigation to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("No scripted control found on challenge page {url}")]
    NoChallengeControl { url: String },

    #[error("Browser session is closed")]
    Closed,
}

/// The identity a session presents to the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User-Agent header value
    pub user_agent: String,

    /// Advertised viewport (width, height)
    pub viewport: (u32, u32),

    /// Proxy URL all traffic is routed through
    pub proxy: Option<String>,

    /// Whether browser-like headers are sent alongside the user agent
    pub stealth: bool,
}

/// A page that finished loading
#[derive(Debug, Clone)]
pub struct LoadedPage {
    url: Url,
    status: u16,
    html: String,
}

impl LoadedPage {
    pub fn new(url: Url, status: u16, html: impl Into<String>) -> Self {
        Self {
            url,
            status,
            html: html.into(),
        }
    }

    /// Final URL after redirects
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parses the page into a queryable document
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// The page title (from the `<title>` tag)
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.document()
            .select(&selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// A navigable browsing context
///
/// The coordinator owns exactly one session for the duration of a run and
/// lends it by `&mut` to one operation at a time. `close` is called exactly
/// once, on every exit path.
#[async_trait]
pub trait BrowserSession: Send {
    /// Applies a stealth identity to all subsequent loads
    async fn apply_identity(&mut self, identity: &Identity) -> Result<(), SessionError>;

    /// Navigates to `url` and returns the loaded page
    async fn load(&mut self, url: &Url) -> Result<LoadedPage, SessionError>;

    /// Performs the scripted action that clears a verification challenge
    /// and returns the page shown afterwards
    async fn solve_challenge(&mut self, page: &LoadedPage) -> Result<LoadedPage, SessionError>;

    /// Releases the session
    async fn close(&mut self) -> Result<(), SessionError>;
}
