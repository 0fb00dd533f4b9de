//! Page fetching
//!
//! This module handles every network read the scraper makes:
//! - Building the HTTP client used for the connectivity probe
//! - Probing the site root before any browser work
//! - Rendering pages in a browser tab with bounded retries and exponential backoff
//! - Classifying failures as timeouts or generic errors

use crate::browser::{PageSession, RenderError};
use crate::config::{BrowserConfig, RetryConfig};
use crate::crawler::detail::extract_detail;
use crate::output::CrawlStats;
use crate::record::DetailContent;
use crate::ScrapeError;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Selector that marks a rendered detail page
const DETAIL_WAIT_SELECTOR: &str = "h2";

/// Builds an HTTP client with proper configuration
///
/// The client presents the same browser-like user agent as the Chromium tabs.
///
/// # Example
///
/// ```no_run
/// use ga_bill_scraper::config::BrowserConfig;
/// use ga_bill_scraper::crawler::build_http_client;
///
/// let client = build_http_client(&BrowserConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &BrowserConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Checks that the site answers before the browser is started
///
/// Any transport error or non-success status is fatal for the run.
pub async fn probe_connection(client: &Client, url: &str) -> Result<(), ScrapeError> {
    tracing::info!("Testing connection to {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ScrapeError::Connectivity {
            url: url.to_string(),
            message: if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            },
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Connectivity {
            url: url.to_string(),
            message: format!("HTTP {}", status),
        });
    }

    tracing::info!("Connection successful ({})", status);
    Ok(())
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Wait before the retry that follows failed attempt `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

/// How the last attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Generic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Generic => write!(f, "error"),
        }
    }
}

/// A page that could not be rendered within the retry budget
#[derive(Debug, Clone, Error)]
#[error("{kind} fetching {url} after {attempts} attempts: {message}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    pub kind: FailureKind,
    pub message: String,
}

/// What to load and how to tell it has rendered
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget<'a> {
    pub url: &'a str,
    pub wait_selector: &'a str,
}

/// Renders pages in a browser tab, retrying failures with backoff
pub struct RetryingFetcher {
    policy: RetryPolicy,
    selector_timeout: Duration,
    stats: Arc<CrawlStats>,
}

impl RetryingFetcher {
    pub fn new(policy: RetryPolicy, selector_timeout: Duration, stats: Arc<CrawlStats>) -> Self {
        Self {
            policy,
            selector_timeout,
            stats,
        }
    }

    /// Loads `target` and runs `extract` on the rendered HTML
    ///
    /// A page whose wait selector never appears is still read: the document
    /// loaded, it just may not contain what the caller looks for.
    pub async fn fetch<S, T, F>(
        &self,
        session: &mut S,
        target: RenderTarget<'_>,
        extract: F,
    ) -> Result<T, FetchError>
    where
        S: PageSession + ?Sized,
        F: Fn(&str) -> T,
    {
        let mut attempt = 0;
        loop {
            match self.render(session, target).await {
                Ok(html) => return Ok(extract(&html)),
                Err(e) => {
                    let kind = if e.is_timeout() {
                        FailureKind::Timeout
                    } else {
                        FailureKind::Generic
                    };

                    if attempt + 1 >= self.policy.max_attempts {
                        return Err(FetchError {
                            url: target.url.to_string(),
                            attempts: attempt + 1,
                            kind,
                            message: e.to_string(),
                        });
                    }

                    let wait = self.policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        "{} on {} (attempt {}/{}), retrying in {:?}: {}",
                        kind,
                        target.url,
                        attempt + 1,
                        self.policy.max_attempts,
                        wait,
                        e
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn render<S>(&self, session: &mut S, target: RenderTarget<'_>) -> Result<String, RenderError>
    where
        S: PageSession + ?Sized,
    {
        session.goto(target.url).await?;

        if let Err(e) = session
            .wait_for_selector(target.wait_selector, self.selector_timeout)
            .await
        {
            if !e.is_timeout() {
                return Err(e);
            }
            tracing::debug!("'{}' never appeared on {}", target.wait_selector, target.url);
        }

        session.content().await
    }

    /// Fetches and extracts a bill detail page
    ///
    /// Exhausted retries are counted as a failure and yield the empty sentinel;
    /// nothing propagates to the caller.
    pub async fn fetch_detail<S>(&self, session: &mut S, url: &str) -> DetailContent
    where
        S: PageSession + ?Sized,
    {
        let target = RenderTarget {
            url,
            wait_selector: DETAIL_WAIT_SELECTOR,
        };

        match self.fetch(session, target, extract_detail).await {
            Ok(detail) => detail,
            Err(e) => {
                self.stats.record_failed();
                tracing::warn!("Giving up on detail page: {}", e);
                DetailContent::empty()
            }
        }
    }
}
