use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Anjuke-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub pacing: PacingConfig,
    #[serde(rename = "anti-detection")]
    pub anti_detection: AntiDetectionConfig,
    pub validation: ValidationConfig,
    pub output: OutputConfig,
}

/// Catalog walk configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Catalog root, e.g. `https://hf.zu.anjuke.com/fangyuan`
    pub base_url: String,

    /// Region slugs to walk in order; empty means the whole catalog
    pub regions: Vec<String>,

    /// Maximum catalog pages per region
    pub max_pages: u32,

    /// Maximum detail links taken from one catalog page
    pub max_houses_per_page: usize,

    /// Run stops once this many records were accepted
    pub max_total_houses: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hf.zu.anjuke.com/fangyuan".to_string(),
            regions: Vec::new(),
            max_pages: 100,
            max_houses_per_page: 60,
            max_total_houses: 50_000,
        }
    }
}

impl CrawlConfig {
    /// Region slots in crawl order
    ///
    /// An empty region list yields a single region-less slot so that the
    /// catalog root itself is paginated.
    pub fn region_slots(&self) -> Vec<Option<String>> {
        let regions: Vec<Option<String>> = self
            .regions
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(|r| Some(r.to_string()))
            .collect();

        if regions.is_empty() {
            vec![None]
        } else {
            regions
        }
    }
}

/// Timing of page loads (all values in milliseconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PacingConfig {
    /// Lower edge of the randomized post-load delay window
    pub min_delay_ms: u64,

    /// Upper edge of the randomized post-load delay window
    pub max_delay_ms: u64,

    /// Pause between two catalog pages
    pub page_interval_ms: u64,

    /// Wait after a load before the page is inspected
    pub settle_ms: u64,

    /// Upper bound for a single navigation
    pub timeout_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 2000,
            max_delay_ms: 2600,
            page_interval_ms: 3000,
            settle_ms: 2000,
            timeout_ms: 30_000,
        }
    }
}

impl PacingConfig {
    pub fn delay_window(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// When a fresh identity (user agent, proxy) is picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationPolicy {
    /// One identity for the whole run
    #[default]
    PerSession,

    /// A new identity for every navigation attempt
    PerAttempt,
}

/// Stealth, retry and verification-challenge settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AntiDetectionConfig {
    /// Disguise the automated client as a desktop browser
    pub stealth: bool,

    /// Try to solve verification challenges by script
    pub auto_verification: bool,

    /// Total navigation attempts per URL
    pub max_retries: u32,

    /// Back-off between two navigation attempts
    pub retry_delay_ms: u64,

    /// Scripted resolution attempts per detected challenge
    pub challenge_attempts: u32,

    /// How long to wait for a human to clear a challenge (0 disables)
    pub manual_wait_ms: u64,

    /// Proxy pool, e.g. `http://127.0.0.1:8080`
    pub proxies: Vec<String>,

    pub rotation: RotationPolicy,

    /// Replaces the built-in user-agent pool when non-empty
    pub user_agents: Vec<String>,
}

impl Default for AntiDetectionConfig {
    fn default() -> Self {
        Self {
            stealth: true,
            auto_verification: true,
            max_retries: 3,
            retry_delay_ms: 5000,
            challenge_attempts: 3,
            manual_wait_ms: 0,
            proxies: Vec::new(),
            rotation: RotationPolicy::PerSession,
            user_agents: Vec::new(),
        }
    }
}

/// Range checks applied to extracted records
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ValidationConfig {
    pub enabled: bool,

    /// Monthly rent lower bound (yuan, inclusive)
    pub min_price: u32,

    /// Monthly rent upper bound (yuan, inclusive)
    pub max_price: u32,

    /// Floor area lower bound (square metres, inclusive)
    pub min_area: f64,

    /// Floor area upper bound (square metres, inclusive)
    pub max_area: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_price: 100,
            max_price: 50_000,
            min_area: 1.0,
            max_area: 1000.0,
        }
    }
}

/// Durable output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Path to the CSV file or SQLite database
    pub path: String,

    /// Keep rows already present in an existing CSV file
    pub append: bool,

    /// Skip listings whose house id is already in the output
    pub dedup: bool,

    /// Optional CSV file receiving one row per verification challenge
    pub verification_log: Option<String>,

    /// Log per-record progress lines
    pub show_progress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            path: "anjuke_houses.csv".to_string(),
            append: false,
            dedup: false,
            verification_log: None,
            show_progress: true,
        }
    }
}
