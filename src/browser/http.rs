//! HTTP-backed browser session
//!
//! `HttpSession` keeps one cookie jar for the whole run and rebuilds its
//! reqwest client whenever a new identity is applied, so that user agent,
//! browser headers and proxy change together while cookies survive.

use crate::browser::{BrowserSession, Identity, LoadedPage, SessionError};
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy, Response};
use scraper::{ElementRef, Selector};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Words marking the control that clears a challenge
const CHALLENGE_CONTROL_WORDS: &[&str] = &["验证", "继续访问", "verify", "continue"];

/// A cookie-keeping HTTP client that presents itself as a desktop browser
pub struct HttpSession {
    client: Client,
    jar: Arc<Jar>,
    timeout: Duration,
    closed: bool,
}

impl HttpSession {
    /// Starts a session with the given identity
    ///
    /// Fails when the underlying client cannot be built (bad proxy, TLS
    /// backend unavailable). Callers treat this as fatal.
    pub fn launch(identity: &Identity, timeout: Duration) -> Result<Self, SessionError> {
        let jar = Arc::new(Jar::default());
        let client = build_client(identity, Arc::clone(&jar), timeout)?;

        tracing::debug!(
            user_agent = %identity.user_agent,
            proxy = identity.proxy.as_deref().unwrap_or("none"),
            "Browser session launched"
        );

        Ok(Self {
            client,
            jar,
            timeout,
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    async fn into_page(url: &Url, response: Response) -> Result<LoadedPage, SessionError> {
        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(SessionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| classify_error(url, e))?;

        Ok(LoadedPage::new(final_url, status.as_u16(), html))
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn apply_identity(&mut self, identity: &Identity) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.client = build_client(identity, Arc::clone(&self.jar), self.timeout)?;
        Ok(())
    }

    async fn load(&mut self, url: &Url) -> Result<LoadedPage, SessionError> {
        self.ensure_open()?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        Self::into_page(url, response).await
    }

    async fn solve_challenge(&mut self, page: &LoadedPage) -> Result<LoadedPage, SessionError> {
        self.ensure_open()?;

        let action = challenge_action(page).ok_or_else(|| SessionError::NoChallengeControl {
            url: page.url().to_string(),
        })?;

        tracing::debug!(url = %page.url(), ?action, "Submitting challenge control");

        let (target, request) = match action {
            ChallengeAction::Follow(target) => {
                let request = self.client.get(target.clone());
                (target, request)
            }
            ChallengeAction::Submit {
                post,
                target,
                fields,
            } => {
                let request = if post {
                    self.client.post(target.clone()).form(&fields)
                } else {
                    self.client.get(target.clone()).query(&fields)
                };
                (target, request)
            }
        };

        let response = request
            .header(header::REFERER, page.url().as_str())
            .send()
            .await
            .map_err(|e| classify_error(&target, e))?;

        Self::into_page(&target, response).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if !self.closed {
            self.closed = true;
            tracing::debug!("Browser session closed");
        }
        Ok(())
    }
}

/// Builds a client presenting `identity`
fn build_client(
    identity: &Identity,
    jar: Arc<Jar>,
    timeout: Duration,
) -> Result<Client, SessionError> {
    let mut builder = Client::builder()
        .user_agent(identity.user_agent.as_str())
        .default_headers(browser_headers(identity))
        .cookie_provider(jar)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &identity.proxy {
        let proxy = Proxy::all(proxy.as_str()).map_err(|e| SessionError::Proxy {
            proxy: proxy.clone(),
            message: e.to_string(),
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| SessionError::Launch(e.to_string()))
}

/// Headers a desktop browser sends with every navigation
fn browser_headers(identity: &Identity) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if !identity.stealth {
        return headers;
    }

    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));

    let platform = if identity.user_agent.contains("Macintosh") {
        "\"macOS\""
    } else {
        "\"Windows\""
    };
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static(platform));
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));

    if let Ok(width) = HeaderValue::from_str(&identity.viewport.0.to_string()) {
        headers.insert("viewport-width", width);
    }

    headers
}

fn classify_error(url: &Url, error: reqwest::Error) -> SessionError {
    if error.is_timeout() {
        SessionError::Timeout {
            url: url.to_string(),
        }
    } else {
        SessionError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// What to do to clear a challenge page
#[derive(Debug, Clone, PartialEq)]
enum ChallengeAction {
    /// Submit a form with its current field values
    Submit {
        post: bool,
        target: Url,
        fields: Vec<(String, String)>,
    },

    /// Follow a "continue" link
    Follow(Url),
}

/// Locates the challenge control on a page
///
/// A form mentioning a control word wins, then the first form on the page,
/// then the first link whose text carries a control word.
fn challenge_action(page: &LoadedPage) -> Option<ChallengeAction> {
    let document = page.document();
    let form_selector = Selector::parse("form").ok()?;
    let field_selector = Selector::parse("input[name], textarea[name]").ok()?;
    let link_selector = Selector::parse("a[href]").ok()?;

    let forms: Vec<ElementRef> = document.select(&form_selector).collect();
    let form = forms
        .iter()
        .find(|form| mentions_control_word(&form.html()))
        .or_else(|| forms.first());

    if let Some(form) = form {
        let target = match form.value().attr("action").map(str::trim) {
            Some(action) if !action.is_empty() => page.url().join(action).ok()?,
            _ => page.url().clone(),
        };
        let post = form
            .value()
            .attr("method")
            .is_some_and(|m| m.eq_ignore_ascii_case("post"));
        let fields = form
            .select(&field_selector)
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or_default();
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        return Some(ChallengeAction::Submit {
            post,
            target,
            fields,
        });
    }

    document
        .select(&link_selector)
        .filter(|link| mentions_control_word(&link.text().collect::<String>()))
        .filter_map(|link| link.value().attr("href"))
        .filter(|href| !href.trim_start().to_ascii_lowercase().starts_with("javascript:"))
        .find_map(|href| page.url().join(href).ok())
        .map(ChallengeAction::Follow)
}

fn mentions_control_word(text: &str) -> bool {
    let lower = text.to_lowercase();
    CHALLENGE_CONTROL_WORDS.iter().any(|w| lower.contains(w))
}
