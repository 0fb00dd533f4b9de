//! Crawler module for the bill listing and detail pages
//!
//! This module contains the core scraping logic, including:
//! - Listing and detail page extraction
//! - Browser page fetching with retry logic
//! - Listing pagination
//! - Request pacing
//! - Overall crawl coordination

mod coordinator;
mod detail;
pub mod dom;
mod fetcher;
mod listing;
mod pagination;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use detail::extract_detail;
pub use fetcher::{
    build_http_client, probe_connection, FailureKind, FetchError, RenderTarget, RetryPolicy,
    RetryingFetcher,
};
pub use listing::{discover_result_range, extract_rows, highest_page_link, ResultRange};
pub use pagination::{
    AdvanceStrategy, CrawlOutcome, ListingPage, PaginationDriver, PaginationSettings,
};
pub use scheduler::Pacer;
