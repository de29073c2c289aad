//! Navigation guard
//!
//! Every page load in a crawl goes through [`NavigationGuard::safe_navigate`].
//! One attempt runs the phases of [`NavigationPhase`]:
//!
//! | Phase | Action |
//! |-------|--------|
//! | Configure | Apply a stealth identity (once per session or per attempt) |
//! | Load | Navigate with a bounded timeout, then let the page settle |
//! | ChallengeCheck | Detect a verification challenge; solve it by script, else ask for manual help |
//! | Pace | Sleep a random delay from the configured window |
//! | Retry | On failure, back off and start over until the attempt budget is spent |
//!
//! Whatever goes wrong, the caller gets one of the two [`NavOutcome`]s.

use crate::browser::{BrowserSession, LoadedPage, SessionError, StealthProfile};
use crate::config::{Config, RotationPolicy};
use crate::output::{ChallengeOutcome, CrawlEvent, CrawlReporter};
use crate::state::NavigationPhase;
use rand::Rng;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

const CHALLENGE_URL_MARKERS: &[&str] = &["verifycode", "antibot"];
const CHALLENGE_TITLE_MARKERS: &[&str] = &["验证码", "访问过于频繁", "安全验证", "请输入验证码"];
const CHALLENGE_BODY_MARKERS: &[&str] = &[
    "点击按钮进行验证",
    "点击按钮完成验证",
    "访问过于频繁，本次访问做以下验证码校验",
];

/// What gave a verification challenge away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeSignal {
    Url,
    Title,
    Body,
}

impl ChallengeSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeSignal::Url => "url",
            ChallengeSignal::Title => "title",
            ChallengeSignal::Body => "body",
        }
    }
}

impl fmt::Display for ChallengeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks for a verification challenge on a loaded page
pub fn detect_challenge(page: &LoadedPage) -> Option<ChallengeSignal> {
    let url = page.url().as_str();
    if CHALLENGE_URL_MARKERS.iter().any(|m| url.contains(m)) {
        return Some(ChallengeSignal::Url);
    }

    if let Some(title) = page.title() {
        if CHALLENGE_TITLE_MARKERS.iter().any(|m| title.contains(m)) {
            return Some(ChallengeSignal::Title);
        }
    }

    if CHALLENGE_BODY_MARKERS.iter().any(|m| page.html().contains(m)) {
        return Some(ChallengeSignal::Body);
    }

    None
}

/// Why a single navigation attempt failed
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("navigation timed out after {0:?}")]
    Timeout(Duration),

    #[error("verification challenge unresolved (detected by {0})")]
    ChallengeUnresolved(ChallengeSignal),
}

/// Result of a guarded navigation
#[derive(Debug)]
pub enum NavOutcome {
    Success(LoadedPage),
    ExhaustedRetries {
        url: String,
        attempts: u32,
        last_error: NavigationError,
    },
}

/// Timing and budget knobs of the guard
#[derive(Debug, Clone, PartialEq)]
pub struct GuardSettings {
    /// Total attempts per URL
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub settle: Duration,
    pub delay_window: (Duration, Duration),
    pub auto_verification: bool,
    pub challenge_attempts: u32,

    /// How long to wait for a human to clear a challenge
    pub manual_wait: Duration,
}

impl GuardSettings {
    pub fn from_config(config: &Config) -> Self {
        let anti = &config.anti_detection;
        Self {
            max_attempts: anti.max_retries.max(1),
            retry_delay: Duration::from_millis(anti.retry_delay_ms),
            timeout: config.pacing.timeout(),
            settle: Duration::from_millis(config.pacing.settle_ms),
            delay_window: config.pacing.delay_window(),
            auto_verification: anti.auto_verification,
            challenge_attempts: anti.challenge_attempts,
            manual_wait: Duration::from_millis(anti.manual_wait_ms),
        }
    }
}

/// Wraps every navigation in stealth, challenge handling, pacing and retries
pub struct NavigationGuard {
    settings: GuardSettings,
    profile: StealthProfile,
    identity_applied: bool,
}

impl NavigationGuard {
    pub fn new(settings: GuardSettings, profile: StealthProfile) -> Self {
        Self {
            settings,
            profile,
            identity_applied: false,
        }
    }

    /// Navigates to `url`, retrying within the attempt budget
    pub async fn safe_navigate<S>(
        &mut self,
        session: &mut S,
        url: &Url,
        reporter: &mut dyn CrawlReporter,
    ) -> NavOutcome
    where
        S: BrowserSession + ?Sized,
    {
        let budget = self.settings.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let error = match self.attempt(session, url, reporter).await {
                Ok(page) => {
                    self.pace().await;
                    tracing::debug!(url = %url, phase = %NavigationPhase::Done, attempt, "Navigation done");
                    return NavOutcome::Success(page);
                }
                Err(error) => error,
            };

            let message = error.to_string();
            if attempt >= budget {
                tracing::debug!(url = %url, phase = %NavigationPhase::Exhausted, attempt);
                reporter.report(&CrawlEvent::NavigationExhausted {
                    url: url.as_str(),
                    attempts: attempt,
                    error: &message,
                });
                return NavOutcome::ExhaustedRetries {
                    url: url.to_string(),
                    attempts: attempt,
                    last_error: error,
                };
            }

            tracing::debug!(url = %url, phase = %NavigationPhase::Retry, attempt);
            reporter.report(&CrawlEvent::NavigationRetry {
                url: url.as_str(),
                attempt,
                max_attempts: budget,
                error: &message,
            });
            tokio::time::sleep(self.settings.retry_delay).await;
            attempt += 1;
        }
    }

    /// One pass through Configure, Load and ChallengeCheck
    async fn attempt<S>(
        &mut self,
        session: &mut S,
        url: &Url,
        reporter: &mut dyn CrawlReporter,
    ) -> Result<LoadedPage, NavigationError>
    where
        S: BrowserSession + ?Sized,
    {
        self.configure(session).await?;

        tracing::debug!(url = %url, phase = %NavigationPhase::Load);
        let page = self.load(session, url).await?;

        tracing::debug!(url = %url, phase = %NavigationPhase::ChallengeCheck);
        self.clear_challenge(session, url, page, reporter).await
    }

    async fn configure<S>(&mut self, session: &mut S) -> Result<(), NavigationError>
    where
        S: BrowserSession + ?Sized,
    {
        let fresh = match self.profile.rotation() {
            RotationPolicy::PerAttempt => true,
            RotationPolicy::PerSession => !self.identity_applied,
        };
        if !fresh {
            return Ok(());
        }

        let identity = self.profile.next_identity();
        tracing::debug!(
            phase = %NavigationPhase::Configure,
            user_agent = %identity.user_agent,
            proxy = identity.proxy.as_deref().unwrap_or("none"),
            "Applying identity"
        );
        session.apply_identity(&identity).await?;
        self.identity_applied = true;
        Ok(())
    }

    /// Loads `url` within the timeout and waits for the page to settle
    async fn load<S>(&self, session: &mut S, url: &Url) -> Result<LoadedPage, NavigationError>
    where
        S: BrowserSession + ?Sized,
    {
        let page = match tokio::time::timeout(self.settings.timeout, session.load(url)).await {
            Ok(result) => result?,
            Err(_) => return Err(NavigationError::Timeout(self.settings.timeout)),
        };
        tracing::debug!(
            url = %url,
            final_url = %page.url(),
            status = page.status(),
            bytes = page.html().len(),
            "Page loaded"
        );

        if !self.settings.settle.is_zero() {
            tokio::time::sleep(self.settings.settle).await;
        }
        Ok(page)
    }

    /// Returns the page once no challenge is in the way
    async fn clear_challenge<S>(
        &mut self,
        session: &mut S,
        url: &Url,
        page: LoadedPage,
        reporter: &mut dyn CrawlReporter,
    ) -> Result<LoadedPage, NavigationError>
    where
        S: BrowserSession + ?Sized,
    {
        let Some(signal) = detect_challenge(&page) else {
            return Ok(page);
        };

        let started = Instant::now();
        reporter.report(&CrawlEvent::ChallengeDetected {
            url: url.as_str(),
            signal: signal.as_str(),
        });

        let mut attempts = 0;
        if self.settings.auto_verification {
            let mut current = page;
            while attempts < self.settings.challenge_attempts {
                attempts += 1;
                match session.solve_challenge(&current).await {
                    Ok(next) => {
                        if !self.settings.settle.is_zero() {
                            tokio::time::sleep(self.settings.settle).await;
                        }
                        if detect_challenge(&next).is_none() {
                            reporter.report(&CrawlEvent::ChallengeFinished {
                                url: url.as_str(),
                                outcome: ChallengeOutcome::Resolved,
                                attempts,
                                elapsed: started.elapsed(),
                            });
                            return Ok(next);
                        }
                        current = next;
                    }
                    Err(e) => {
                        tracing::debug!(url = %url, attempt = attempts, error = %e, "Challenge submission failed");
                    }
                }
            }
        }

        reporter.report(&CrawlEvent::ManualInterventionRequired {
            url: url.as_str(),
            wait: self.settings.manual_wait,
        });

        if !self.settings.manual_wait.is_zero() {
            tokio::time::sleep(self.settings.manual_wait).await;
            if let Ok(page) = self.load(session, url).await {
                if detect_challenge(&page).is_none() {
                    reporter.report(&CrawlEvent::ChallengeFinished {
                        url: url.as_str(),
                        outcome: ChallengeOutcome::ResolvedManually,
                        attempts,
                        elapsed: started.elapsed(),
                    });
                    return Ok(page);
                }
            }
        }

        reporter.report(&CrawlEvent::ChallengeFinished {
            url: url.as_str(),
            outcome: ChallengeOutcome::Unresolved,
            attempts,
            elapsed: started.elapsed(),
        });
        Err(NavigationError::ChallengeUnresolved(signal))
    }

    /// Sleeps a random delay from the pacing window
    async fn pace(&self) {
        let delay = self.pacing_delay();
        tracing::trace!(phase = %NavigationPhase::Pace, delay_ms = delay.as_millis() as u64);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn pacing_delay(&self) -> Duration {
        let (min, max) = self.settings.delay_window;
        if max <= min {
            return min;
        }
        let ms = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
pub(crate) fn instant_settings(max_attempts: u32) -> GuardSettings {
    GuardSettings {
        max_attempts,
        retry_delay: Duration::ZERO,
        timeout: Duration::from_secs(5),
        settle: Duration::ZERO,
        delay_window: (Duration::ZERO, Duration::ZERO),
        auto_verification: true,
        challenge_attempts: 2,
        manual_wait: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::ScriptedSession;
    use crate::config::AntiDetectionConfig;
    use crate::output::RecordingReporter;

    const CATALOG: &str = "https://hf.zu.anjuke.com/fangyuan/shushan/";
    const CHALLENGE_PAGE: &str =
        "<html><head><title>安全验证</title></head><body><button>点击按钮进行验证</button></body></html>";
    const CONTENT_PAGE: &str = "<html><head><title>合肥租房</title></head><body>ok</body></html>";

    fn guard(settings: GuardSettings) -> NavigationGuard {
        NavigationGuard::new(
            settings,
            StealthProfile::from_config(&AntiDetectionConfig::default()),
        )
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn page(u: &str, html: &str) -> LoadedPage {
        LoadedPage::new(url(u), 200, html)
    }

    #[test]
    fn test_detect_challenge() {
        assert_eq!(
            detect_challenge(&page("https://callback.58.com/antibot/verifycode?x=1", "")),
            Some(ChallengeSignal::Url)
        );
        assert_eq!(
            detect_challenge(&page(CATALOG, CHALLENGE_PAGE)),
            Some(ChallengeSignal::Title)
        );
        assert_eq!(
            detect_challenge(&page(CATALOG, "<p>访问过于频繁，本次访问做以下验证码校验</p>")),
            Some(ChallengeSignal::Body)
        );
        assert_eq!(detect_challenge(&page(CATALOG, CONTENT_PAGE)), None);
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let mut session = ScriptedSession::new().page(CATALOG, CONTENT_PAGE);
        let mut reporter = RecordingReporter::default();
        let mut guard = guard(instant_settings(3));

        let outcome = guard
            .safe_navigate(&mut session, &url(CATALOG), &mut reporter)
            .await;

        assert!(matches!(outcome, NavOutcome::Success(ref p) if p.html() == CONTENT_PAGE));
        assert_eq!(session.load_count(CATALOG), 1);
        assert_eq!(reporter.count("NavigationRetry"), 0);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let mut session = ScriptedSession::new()
            .status(CATALOG, 502)
            .timeout(CATALOG)
            .page(CATALOG, CONTENT_PAGE);
        let mut reporter = RecordingReporter::default();
        let mut guard = guard(instant_settings(3));

        let outcome = guard
            .safe_navigate(&mut session, &url(CATALOG), &mut reporter)
            .await;

        assert!(matches!(outcome, NavOutcome::Success(_)));
        assert_eq!(session.load_count(CATALOG), 3);
        assert_eq!(reporter.count("NavigationRetry"), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries() {
        let mut session = ScriptedSession::new().status(CATALOG, 503);
        let mut reporter = RecordingReporter::default();
        let mut guard = guard(instant_settings(3));

        let outcome = guard
            .safe_navigate(&mut session, &url(CATALOG), &mut reporter)
            .await;

        match outcome {
            NavOutcome::ExhaustedRetries {
                url,
                attempts,
                last_error,
            } => {
                assert_eq!(url, CATALOG);
                assert_eq!(attempts, 3);
                assert!(matches!(
                    last_error,
                    NavigationError::Session(SessionError::Status { status: 503, .. })
                ));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(session.load_count(CATALOG), 3);
        assert_eq!(reporter.count("NavigationExhausted"), 1);
    }

    #[tokio::test]
    async fn test_challenge_solved_by_script() {
        let mut session = ScriptedSession::new()
            .page(CATALOG, CHALLENGE_PAGE)
            .solution(CHALLENGE_PAGE)
            .solution(CONTENT_PAGE);
        let mut reporter = RecordingReporter::default();
        let mut guard = guard(instant_settings(1));

        let outcome = guard
            .safe_navigate(&mut session, &url(CATALOG), &mut reporter)
            .await;

        assert!(matches!(outcome, NavOutcome::Success(ref p) if p.html() == CONTENT_PAGE));
        assert_eq!(session.solve_calls, 2);
        assert_eq!(reporter.count("ChallengeDetected"), 1);
        assert_eq!(reporter.count("ChallengeFinished"), 1);
        assert_eq!(reporter.count("ManualInterventionRequired"), 0);
    }

    #[tokio::test]
    async fn test_unresolved_challenge_counts_as_failed_attempt() {
        let mut session = ScriptedSession::new().page(CATALOG, CHALLENGE_PAGE);
        let mut reporter = RecordingReporter::default();
        let mut guard = guard(instant_settings(2));

        let outcome = guard
            .safe_navigate(&mut session, &url(CATALOG), &mut reporter)
            .await;

        assert!(matches!(
            outcome,
            NavOutcome::ExhaustedRetries {
                attempts: 2,
                last_error: NavigationError::ChallengeUnresolved(ChallengeSignal::Title),
                ..
            }
        ));
        // two scripted tries per attempt, both without a queued solution
        assert_eq!(session.solve_calls, 4);
        assert_eq!(reporter.count("ManualInterventionRequired"), 2);
    }

    #[tokio::test]
    async fn test_manual_path_when_auto_disabled() {
        let mut session = ScriptedSession::new()
            .page(CATALOG, CHALLENGE_PAGE)
            .page(CATALOG, CONTENT_PAGE);
        let mut reporter = RecordingReporter::default();
        let mut settings = instant_settings(1);
        settings.auto_verification = false;
        settings.manual_wait = Duration::from_millis(1);
        let mut guard = guard(settings);

        let outcome = guard
            .safe_navigate(&mut session, &url(CATALOG), &mut reporter)
            .await;

        assert!(matches!(outcome, NavOutcome::Success(_)));
        assert_eq!(session.solve_calls, 0);
        assert_eq!(reporter.count("ManualInterventionRequired"), 1);
        assert!(reporter
            .events
            .iter()
            .any(|e| e.contains("ResolvedManually")));
    }

    #[tokio::test]
    async fn test_identity_rotation() {
        let target = url(CATALOG);

        let mut session = ScriptedSession::new().page(CATALOG, CONTENT_PAGE);
        let mut guard = guard(instant_settings(1));
        for _ in 0..3 {
            guard
                .safe_navigate(&mut session, &target, &mut RecordingReporter::default())
                .await;
        }
        assert_eq!(session.identities.len(), 1);

        let config = AntiDetectionConfig {
            rotation: RotationPolicy::PerAttempt,
            ..AntiDetectionConfig::default()
        };
        let mut session = ScriptedSession::new().page(CATALOG, CONTENT_PAGE);
        let mut guard =
            NavigationGuard::new(instant_settings(1), StealthProfile::from_config(&config));
        for _ in 0..3 {
            guard
                .safe_navigate(&mut session, &target, &mut RecordingReporter::default())
                .await;
        }
        assert_eq!(session.identities.len(), 3);
    }

    #[test]
    fn test_pacing_delay_within_window() {
        let mut settings = instant_settings(1);
        settings.delay_window = (Duration::from_millis(2000), Duration::from_millis(2600));
        let guard = guard(settings);

        for _ in 0..20 {
            let delay = guard.pacing_delay();
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay <= Duration::from_millis(2600));
        }
    }

    #[test]
    fn test_settings_from_config() {
        let settings = GuardSettings::from_config(&Config::default());
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.retry_delay, Duration::from_secs(5));
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(
            settings.delay_window,
            (Duration::from_millis(2000), Duration::from_millis(2600))
        );
    }
}
