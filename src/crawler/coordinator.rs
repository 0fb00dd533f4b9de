//! Crawl coordinator
//!
//! Ties the pieces together for one run: the pagination driver yields listing
//! pages, every row is enriched from its detail page (through the cache),
//! merged records are validated, and the result is deduplicated and written.

use crate::browser::{ChromeBrowser, ChromeSession, PageSession};
use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, probe_connection, RetryPolicy, RetryingFetcher};
use crate::crawler::pagination::{CrawlOutcome, ListingPage, PaginationDriver, PaginationSettings};
use crate::crawler::scheduler::Pacer;
use crate::output::{write_output, CrawlStats, StatsSnapshot};
use crate::record::{dedup_by_doc_number, validate_record, BillRecord, DetailContent, ListingRow};
use crate::storage::DetailCache;
use crate::ScrapeError;
use std::sync::Arc;
use std::time::Instant;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Validated, deduplicated records in page order, then table order
    pub records: Vec<BillRecord>,
    pub outcome: CrawlOutcome,
    pub pages_scraped: u32,
    pub total_pages: Option<u32>,
    pub duplicates_removed: usize,
    /// Merged records dropped by validation
    pub rejected: usize,
    pub stats: StatsSnapshot,
}

/// Coordinator manages one scraper run over two browser tabs
///
/// The listing tab stays on the paginated listing for the whole run; the
/// detail tab is navigated to each bill's detail page in turn.
pub struct Coordinator<S: PageSession> {
    listing: S,
    detail: S,
    driver: PaginationDriver,
    cache: DetailCache,
    fetcher: RetryingFetcher,
    detail_pacer: Pacer,
    stats: Arc<CrawlStats>,
    records: Vec<BillRecord>,
    rejected: usize,
}

impl<S: PageSession> Coordinator<S> {
    /// Creates a coordinator over an already opened pair of tabs
    pub fn new(
        config: &Config,
        settings: PaginationSettings,
        listing: S,
        detail: S,
        cache: DetailCache,
        stats: Arc<CrawlStats>,
    ) -> Self {
        let fetcher = RetryingFetcher::new(
            RetryPolicy::from(&config.retry),
            config.browser.detail_selector_timeout(),
            Arc::clone(&stats),
        );

        Self {
            listing,
            detail,
            driver: PaginationDriver::new(settings),
            cache,
            fetcher,
            detail_pacer: Pacer::new(config.crawler.request_delay()),
            stats,
            records: Vec::new(),
            rejected: 0,
        }
    }

    /// Runs the crawl to completion (or abort) and returns the report
    pub async fn run(&mut self) -> CrawlReport {
        tracing::info!(
            "Starting scrape ({} cached detail pages in {})",
            self.cache.len(),
            self.cache.path().display()
        );
        let start_time = Instant::now();

        while let Some(page) = self.driver.next_page(&mut self.listing).await {
            self.process_page(page).await;

            let snapshot = self.stats.snapshot();
            tracing::info!(
                "Progress: {} records, {} detail pages fetched, {} from cache, {:.1}s elapsed",
                self.records.len(),
                snapshot.fetched,
                snapshot.cached,
                start_time.elapsed().as_secs_f64()
            );
        }

        let outcome = self.driver.outcome();
        if let CrawlOutcome::Aborted { reason } = &outcome {
            tracing::warn!(
                "Listing crawl aborted ({}); keeping {} records collected so far",
                reason,
                self.records.len()
            );
        }

        let (records, duplicates_removed) = dedup_by_doc_number(std::mem::take(&mut self.records));
        if duplicates_removed > 0 {
            tracing::info!("Removed {} duplicate records", duplicates_removed);
        }

        tracing::info!(
            "Scrape completed: {} records from {} pages in {:?}",
            records.len(),
            self.driver.pages_scraped(),
            start_time.elapsed()
        );

        CrawlReport {
            records,
            outcome,
            pages_scraped: self.driver.pages_scraped(),
            total_pages: self.driver.total_pages(),
            duplicates_removed,
            rejected: self.rejected,
            stats: self.stats.snapshot(),
        }
    }

    async fn process_page(&mut self, page: ListingPage) {
        tracing::debug!("Processing {} rows of page {}", page.rows.len(), page.number);

        for row in page.rows {
            let detail = self.detail_for(&row).await;
            let record = BillRecord::from_parts(row, detail);

            match validate_record(&record) {
                Ok(()) => self.records.push(record),
                Err(e) => {
                    self.rejected += 1;
                    tracing::warn!("Dropping {}: {}", record.doc_number, e);
                }
            }
        }
    }

    /// Cached detail content for a row; only cache misses hit the network
    async fn detail_for(&mut self, row: &ListingRow) -> DetailContent {
        let session = &mut self.detail;
        let fetcher = &self.fetcher;
        let pacer = &mut self.detail_pacer;

        self.cache
            .get_or_fetch(&row.detail_url, move |url| async move {
                pacer.pace().await;
                fetcher.fetch_detail(session, &url).await
            })
            .await
    }

    /// Gives the tabs back so the caller can close them
    pub fn into_sessions(self) -> (S, S) {
        (self.listing, self.detail)
    }
}

async fn open_sessions(browser: &ChromeBrowser) -> Result<(ChromeSession, ChromeSession), ScrapeError> {
    let listing = browser.new_session().await?;
    match browser.new_session().await {
        Ok(detail) => Ok((listing, detail)),
        Err(e) => {
            listing.close().await;
            Err(e.into())
        }
    }
}

/// Runs a complete scrape with a real browser
///
/// 1. Probes the site root (fatal on failure)
/// 2. Loads the detail cache
/// 3. Launches Chromium with a listing tab and a detail tab
/// 4. Crawls until done, aborted, or interrupted by Ctrl-C
/// 5. Closes the tabs and the browser on every path
/// 6. Writes the output file
pub async fn run_crawl(config: Config) -> Result<CrawlReport, ScrapeError> {
    let settings = PaginationSettings::from_config(&config)?;

    let client = build_http_client(&config.browser)?;
    probe_connection(&client, settings.base_url.as_str()).await?;

    let stats = Arc::new(CrawlStats::new());
    let cache = DetailCache::load(&config.output.cache_path, Arc::clone(&stats));
    let source = settings.listing_url.to_string();

    let browser = ChromeBrowser::launch(&config.browser).await?;
    let (listing, detail) = match open_sessions(&browser).await {
        Ok(sessions) => sessions,
        Err(e) => {
            browser.close().await;
            return Err(e);
        }
    };

    let mut coordinator = Coordinator::new(&config, settings, listing, detail, cache, stats);

    let result = tokio::select! {
        report = coordinator.run() => Ok(report),
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; shutting down the browser");
            Err(ScrapeError::Interrupted)
        }
    };

    let (listing, detail) = coordinator.into_sessions();
    listing.close().await;
    detail.close().await;
    browser.close().await;

    let report = result?;
    write_output(
        &config.output.output_path,
        &report.records,
        config.output.format,
        &source,
    )?;

    Ok(report)
}
