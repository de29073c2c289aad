//! Scripted session for unit tests

use crate::browser::{BrowserSession, Identity, LoadedPage, SessionError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use url::Url;

#[derive(Debug, Clone)]
enum Scripted {
    Page { url: Option<Url>, html: String },
    Status(u16),
    Timeout,
}

/// A session that answers loads from a per-URL script
///
/// Each URL owns a queue of responses. The last response of a queue repeats
/// forever; URLs without a script answer 404.
#[derive(Debug, Default)]
pub(crate) struct ScriptedSession {
    script: HashMap<String, VecDeque<Scripted>>,
    solutions: VecDeque<String>,
    pub loads: Vec<String>,
    pub identities: Vec<Identity>,
    pub solve_calls: u32,
    pub close_calls: u32,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, url: &str, response: Scripted) {
        self.script
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Answers `url` with `html`
    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.push(
            url,
            Scripted::Page {
                url: None,
                html: html.to_string(),
            },
        );
        self
    }

    /// Answers `url` with `html` served from `final_url` (a redirect)
    pub fn redirect(mut self, url: &str, final_url: &str, html: &str) -> Self {
        self.push(
            url,
            Scripted::Page {
                url: Some(Url::parse(final_url).unwrap()),
                html: html.to_string(),
            },
        );
        self
    }

    /// Answers `url` with an HTTP error status
    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.push(url, Scripted::Status(status));
        self
    }

    /// Lets loads of `url` time out
    pub fn timeout(mut self, url: &str) -> Self {
        self.push(url, Scripted::Timeout);
        self
    }

    /// Queues the page shown after one successful challenge submission
    pub fn solution(mut self, html: &str) -> Self {
        self.solutions.push_back(html.to_string());
        self
    }

    pub fn load_count(&self, url: &str) -> usize {
        self.loads.iter().filter(|u| u.as_str() == url).count()
    }

    fn next_response(&mut self, url: &str) -> Option<Scripted> {
        let queue = self.script.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn apply_identity(&mut self, identity: &Identity) -> Result<(), SessionError> {
        self.identities.push(identity.clone());
        Ok(())
    }

    async fn load(&mut self, url: &Url) -> Result<LoadedPage, SessionError> {
        let key = url.to_string();
        self.loads.push(key.clone());

        match self.next_response(&key) {
            Some(Scripted::Page { url: final_url, html }) => Ok(LoadedPage::new(
                final_url.unwrap_or_else(|| url.clone()),
                200,
                html,
            )),
            Some(Scripted::Status(status)) => Err(SessionError::Status { url: key, status }),
            Some(Scripted::Timeout) => Err(SessionError::Timeout { url: key }),
            None => Err(SessionError::Status {
                url: key,
                status: 404,
            }),
        }
    }

    async fn solve_challenge(&mut self, page: &LoadedPage) -> Result<LoadedPage, SessionError> {
        self.solve_calls += 1;
        match self.solutions.pop_front() {
            Some(html) => Ok(LoadedPage::new(page.url().clone(), 200, html)),
            None => Err(SessionError::NoChallengeControl {
                url: page.url().to_string(),
            }),
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.close_calls += 1;
        Ok(())
    }
}
