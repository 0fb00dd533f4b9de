use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main configuration structure for the scraper
///
/// Every section and field has a default, so an empty file (or no file at
/// all) yields a configuration that targets the live legis.ga.gov listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub retry: RetryConfig,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Site root; used for the connectivity probe and for resolving detail links
    pub base_url: String,

    /// Path of the paginated bill listing, relative to `base_url`
    pub listing_path: String,
}

impl SiteConfig {
    /// Parses the configured base URL
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    /// Builds the absolute URL of the first listing page
    pub fn listing_url(&self) -> Result<Url, url::ParseError> {
        self.base_url()?.join(&self.listing_path)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.legis.ga.gov".to_string(),
            listing_path: "/legislation/all".to_string(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Upper bound on listing pages to scrape (`None` = all pages)
    pub max_pages: Option<u32>,

    /// Consecutive page-level failures before the crawl is aborted
    pub max_consecutive_failures: u32,

    /// Minimum time between detail page fetches (milliseconds)
    pub request_delay_ms: u64,

    /// Minimum time between listing pages (milliseconds)
    pub page_delay_ms: u64,

    /// Wait after a page-level failure before retrying (milliseconds)
    pub page_retry_delay_ms: u64,

    /// How many times to poll for new content after a pagination click
    pub content_change_polls: u32,

    /// Interval between content polls (milliseconds)
    pub content_change_interval_ms: u64,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn page_retry_delay(&self) -> Duration {
        Duration::from_millis(self.page_retry_delay_ms)
    }

    pub fn content_change_interval(&self) -> Duration {
        Duration::from_millis(self.content_change_interval_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: None,
            max_consecutive_failures: 3,
            request_delay_ms: 500,
            page_delay_ms: 1000,
            page_retry_delay_ms: 5000,
            content_change_polls: 15,
            content_change_interval_ms: 1000,
        }
    }
}

/// Detail fetch retry policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts per detail page, including the first
    pub max_attempts: u32,

    /// Backoff base; attempt `n` waits `base * 2^n` (milliseconds)
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrowserConfig {
    /// Run Chromium without a visible window
    pub headless: bool,

    /// User agent presented by both the browser and the probe client
    pub user_agent: String,

    /// Optional path to a Chrome/Chromium executable
    pub executable: Option<PathBuf>,

    /// Navigation deadline per page load (seconds)
    pub navigation_timeout_secs: u64,

    /// Deadline when waiting for listing rows to render (seconds)
    pub selector_timeout_secs: u64,

    /// Deadline when waiting for detail headings to render (seconds)
    pub detail_selector_timeout_secs: u64,
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }

    pub fn detail_selector_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_selector_timeout_secs)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            executable: None,
            navigation_timeout_secs: 60,
            selector_timeout_secs: 10,
            detail_selector_timeout_secs: 5,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Where the final bill list is written
    pub output_path: PathBuf,

    /// Persistent detail page cache
    pub cache_path: PathBuf,

    /// Shape of the output document
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("ga_legislation.json"),
            cache_path: PathBuf::from("bill_details_cache.json"),
            format: OutputFormat::Array,
        }
    }
}

/// Shape of the output JSON document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A bare JSON array of bill records
    #[default]
    Array,

    /// An object with run metadata and a `bills` array
    Envelope,
}
