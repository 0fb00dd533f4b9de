//! Listing pagination driver
//!
//! The bill listing is a single JavaScript page whose table is swapped in place
//! when a pagination control is clicked. [`PaginationDriver`] walks it as a
//! state machine (see [`PaginationState`]):
//!
//! ```text
//! Loading(n) --rows--> ExtractedRows(n) --> Advancing(n) --click--> Loading(n+1)
//!     |  ^                                      |   ^
//!     |  '--failure (retry)                     |   '--failure (retry, total known)
//!     '--no rows--> Advancing(n)                '--> Done | Aborted
//! ```
//!
//! Page 1 is reached by navigation; every later page only by clicking, so a
//! failed click can be retried without losing the tab's position.

use crate::browser::{PageSession, RenderError};
use crate::config::Config;
use crate::crawler::listing::{discover_result_range, extract_rows, highest_page_link};
use crate::crawler::scheduler::Pacer;
use crate::record::ListingRow;
use crate::state::PaginationState;
use std::time::Duration;
use url::Url;

/// Link or button texts that move to the next page (substring match)
const NEXT_LABELS: [&str; 3] = ["Next", "›", "»"];

/// Selectors for next-page controls without usable text
const NEXT_SELECTORS: [&str; 5] = [
    r#"a[rel="next"]"#,
    r#"a[aria-label*="Next"]"#,
    r#"button[aria-label*="Next"]"#,
    ".pagination a.next",
    ".pagination-next",
];

const ROW_SELECTOR: &str = "table tbody tr";
const ROW_FALLBACK_SELECTOR: &str = "table tr";

/// Rows of one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub number: u32,
    pub rows: Vec<ListingRow>,
}

/// How the driver got from one page to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceStrategy {
    /// Clicked the link labelled with the next page number
    PageNumber,
    /// Clicked a "Next" style control
    NextControl,
    /// Clicked the highest numbered link shown, which may skip pages
    HighestVisible(u32),
}

/// A click whose page had not rendered when polling gave up
#[derive(Debug)]
struct PendingAdvance {
    /// Listing content before the first click
    before: String,
    target: u32,
    strategy: AdvanceStrategy,
}

/// How the listing walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    Completed,
    Aborted { reason: String },
}

impl CrawlOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Tunables for the pagination driver
#[derive(Debug, Clone)]
pub struct PaginationSettings {
    pub listing_url: Url,
    /// Base for resolving row links
    pub base_url: Url,
    pub max_pages: Option<u32>,
    pub max_consecutive_failures: u32,
    pub selector_timeout: Duration,
    pub page_delay: Duration,
    pub page_retry_delay: Duration,
    pub content_change_polls: u32,
    pub content_change_interval: Duration,
}

impl PaginationSettings {
    pub fn from_config(config: &Config) -> Result<Self, url::ParseError> {
        Ok(Self {
            listing_url: config.site.listing_url()?,
            base_url: config.site.base_url()?,
            max_pages: config.crawler.max_pages,
            max_consecutive_failures: config.crawler.max_consecutive_failures.max(1),
            selector_timeout: config.browser.selector_timeout(),
            page_delay: config.crawler.page_delay(),
            page_retry_delay: config.crawler.page_retry_delay(),
            content_change_polls: config.crawler.content_change_polls.max(1),
            content_change_interval: config.crawler.content_change_interval(),
        })
    }
}

/// Walks the listing one page at a time
pub struct PaginationDriver {
    settings: PaginationSettings,
    state: PaginationState,
    total_pages: Option<u32>,
    consecutive_failures: u32,
    first_page_loaded: bool,
    pacer: Pacer,
    pending: Option<PendingAdvance>,
    abort_reason: Option<String>,
    pages_scraped: u32,
}

impl PaginationDriver {
    pub fn new(settings: PaginationSettings) -> Self {
        let pacer = Pacer::new(settings.page_delay);
        Self {
            settings,
            state: PaginationState::Loading(1),
            total_pages: None,
            consecutive_failures: 0,
            first_page_loaded: false,
            pacer,
            pending: None,
            abort_reason: None,
            pages_scraped: 0,
        }
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    /// Page count derived from the "X-Y of Z" text, once seen
    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    /// Pages that yielded at least one row
    pub fn pages_scraped(&self) -> u32 {
        self.pages_scraped
    }

    pub fn outcome(&self) -> CrawlOutcome {
        match self.state {
            PaginationState::Aborted => CrawlOutcome::Aborted {
                reason: self
                    .abort_reason
                    .clone()
                    .unwrap_or_else(|| "aborted".to_string()),
            },
            _ => CrawlOutcome::Completed,
        }
    }

    fn transition(&mut self, next: PaginationState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal pagination transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!("Pagination: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Returns the next page of rows, or `None` once the walk is over
    pub async fn next_page<S>(&mut self, session: &mut S) -> Option<ListingPage>
    where
        S: PageSession + ?Sized,
    {
        loop {
            match self.state {
                PaginationState::Loading(n) => {
                    if self.beyond_bounds(n) {
                        self.transition(PaginationState::Done);
                        continue;
                    }

                    let html = match self.load(session).await {
                        Ok(html) => html,
                        Err(e) => {
                            self.page_failure(n, &e.to_string()).await;
                            continue;
                        }
                    };

                    if self.total_pages.is_none() {
                        if let Some(range) = discover_result_range(&html) {
                            tracing::info!(
                                "Listing reports {} bills over {} pages ({} per page)",
                                range.total,
                                range.total_pages(),
                                range.items_per_page()
                            );
                            self.total_pages = Some(range.total_pages());
                        }
                    }

                    let rows = extract_rows(&html, &self.settings.base_url);
                    if rows.is_empty() {
                        self.page_failure(n, "no bill rows found").await;
                        if !self.state.is_terminal() {
                            self.transition(PaginationState::Advancing(n));
                        }
                        continue;
                    }

                    self.consecutive_failures = 0;
                    self.pages_scraped += 1;
                    match self.total_pages {
                        Some(total) => {
                            tracing::info!("Page {}/{}: found {} rows", n, total, rows.len())
                        }
                        None => tracing::info!("Page {}: found {} rows", n, rows.len()),
                    }
                    self.transition(PaginationState::ExtractedRows(n));
                    return Some(ListingPage { number: n, rows });
                }

                PaginationState::ExtractedRows(n) => {
                    self.transition(PaginationState::Advancing(n));
                }

                PaginationState::Advancing(n) => {
                    if let Some(reason) = self.final_page_reason(n) {
                        tracing::info!("Stopping after page {}: {}", n, reason);
                        self.transition(PaginationState::Done);
                        continue;
                    }

                    self.pacer.pace().await;
                    match self.advance(session, n).await {
                        Ok((next, strategy)) => {
                            tracing::debug!("Advanced to page {} ({:?})", next, strategy);
                            self.transition(PaginationState::Loading(next));
                        }
                        Err(e) if self.total_pages.is_some() => {
                            self.page_failure(n, &format!("could not advance: {}", e))
                                .await;
                        }
                        Err(e) => {
                            tracing::info!("No further listing pages after page {}: {}", n, e);
                            self.transition(PaginationState::Done);
                        }
                    }
                }

                PaginationState::Done | PaginationState::Aborted => return None,
            }
        }
    }

    /// A page number past the configured or discovered end
    fn beyond_bounds(&self, n: u32) -> bool {
        self.settings.max_pages.is_some_and(|max| n > max)
            || self.total_pages.is_some_and(|total| n > total)
    }

    /// Why page `n` is the last one to read, if it is
    fn final_page_reason(&self, n: u32) -> Option<String> {
        if let Some(max) = self.settings.max_pages.filter(|max| n >= *max) {
            return Some(format!("reached max pages ({})", max));
        }
        if let Some(total) = self.total_pages.filter(|total| n >= *total) {
            return Some(format!("reached last page ({})", total));
        }
        None
    }

    /// Records a page-level failure; aborts at the threshold, otherwise backs off
    async fn page_failure(&mut self, n: u32, reason: &str) {
        self.consecutive_failures += 1;
        tracing::warn!(
            "Page {} failed ({}/{} consecutive): {}",
            n,
            self.consecutive_failures,
            self.settings.max_consecutive_failures,
            reason
        );

        if self.consecutive_failures >= self.settings.max_consecutive_failures {
            let message = format!(
                "{} consecutive page failures, last on page {}: {}",
                self.consecutive_failures, n, reason
            );
            tracing::error!("Aborting listing crawl: {}", message);
            self.abort_reason = Some(message);
            self.transition(PaginationState::Aborted);
            return;
        }

        if !self.settings.page_retry_delay.is_zero() {
            tokio::time::sleep(self.settings.page_retry_delay).await;
        }
    }

    /// Reads the listing currently in the tab, navigating there the first time
    async fn load<S>(&mut self, session: &mut S) -> Result<String, RenderError>
    where
        S: PageSession + ?Sized,
    {
        if !self.first_page_loaded {
            tracing::info!("Loading listing {}", self.settings.listing_url);
            session.goto(self.settings.listing_url.as_str()).await?;
            self.first_page_loaded = true;

            let timeout = self.settings.selector_timeout;
            if session.wait_for_selector(ROW_SELECTOR, timeout).await.is_err()
                && session
                    .wait_for_selector(ROW_FALLBACK_SELECTOR, timeout)
                    .await
                    .is_err()
            {
                tracing::debug!("Listing rows did not render within {:?}", timeout);
            }
        }

        session.content().await
    }

    /// Clicks through to the page after `n` and waits for the table to change
    ///
    /// A retry after a timed-out click compares against the content from before
    /// that click, so a page that rendered late is accepted instead of clicked
    /// again.
    async fn advance<S>(
        &mut self,
        session: &mut S,
        n: u32,
    ) -> Result<(u32, AdvanceStrategy), RenderError>
    where
        S: PageSession + ?Sized,
    {
        let before = match &self.pending {
            Some(pending) => {
                if session.content().await? != pending.before {
                    let (target, strategy) = (pending.target, pending.strategy);
                    tracing::info!("Page {} finished rendering after the last click", target);
                    self.pending = None;
                    return Ok((target, strategy));
                }
                pending.before.clone()
            }
            None => session.content().await?,
        };

        if let Err(e) = session.scroll_to_bottom().await {
            tracing::debug!("Scroll before pagination failed: {}", e);
        }

        let (next, strategy) = click_next(session, n, &before).await?;
        match self.wait_for_change(session, &before).await {
            Ok(()) => {
                self.pending = None;
                Ok((next, strategy))
            }
            Err(e) => {
                self.pending = Some(PendingAdvance {
                    before,
                    target: next,
                    strategy,
                });
                Err(e)
            }
        }
    }

    async fn wait_for_change<S>(&self, session: &mut S, before: &str) -> Result<(), RenderError>
    where
        S: PageSession + ?Sized,
    {
        let interval = self.settings.content_change_interval;
        let polls = self.settings.content_change_polls;

        for _ in 0..polls {
            tokio::time::sleep(interval).await;
            if session.content().await? != before {
                return Ok(());
            }
        }

        Err(RenderError::Timeout {
            action: "waiting for the listing to change after a click".to_string(),
            timeout: interval.saturating_mul(polls),
        })
    }
}

/// Tries each pagination control in order; the first successful click wins
async fn click_next<S>(
    session: &mut S,
    n: u32,
    html: &str,
) -> Result<(u32, AdvanceStrategy), RenderError>
where
    S: PageSession + ?Sized,
{
    let next = n + 1;

    match session.click_text(&next.to_string(), true).await {
        Ok(()) => return Ok((next, AdvanceStrategy::PageNumber)),
        Err(e) => tracing::trace!("No page link '{}': {}", next, e),
    }

    for label in NEXT_LABELS {
        if session.click_text(label, false).await.is_ok() {
            return Ok((next, AdvanceStrategy::NextControl));
        }
    }
    for selector in NEXT_SELECTORS {
        if session.click_selector(selector).await.is_ok() {
            return Ok((next, AdvanceStrategy::NextControl));
        }
    }

    if let Some(highest) = highest_page_link(html).filter(|h| *h > n) {
        session.click_text(&highest.to_string(), true).await?;
        return Ok((highest, AdvanceStrategy::HighestVisible(highest)));
    }

    Err(RenderError::ElementNotFound(format!(
        "pagination control after page {}",
        n
    )))
}
