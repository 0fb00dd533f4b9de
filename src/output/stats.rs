//! Run statistics
//!
//! Counters are shared by `Arc` between the detail cache and the fetcher and
//! updated with relaxed atomics; the run is sequential, so the counts are exact.

use crate::crawler::{CrawlOutcome, CrawlReport};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one scraper run
#[derive(Debug, Default)]
pub struct CrawlStats {
    fetched: AtomicU64,
    cached: AtomicU64,
    failed: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A detail page was rendered over the network and stored
    pub fn record_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// A detail page was served from the cache
    pub fn record_cached(&self) {
        self.cached.fetch_add(1, Ordering::Relaxed);
    }

    /// A detail page exhausted its retries
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetched: self.fetched.load(Ordering::Relaxed),
            cached: self.cached.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub fetched: u64,
    pub cached: u64,
    pub failed: u64,
}

impl StatsSnapshot {
    /// Detail lookups served, whether from the network or the cache
    pub fn total_lookups(&self) -> u64 {
        self.fetched + self.cached
    }
}

/// Prints the end-of-run report to stdout in a formatted manner
pub fn print_statistics(report: &CrawlReport) {
    println!("=== Scrape Statistics ===\n");

    println!("Listing:");
    println!("  Pages scraped: {}", report.pages_scraped);
    match report.total_pages {
        Some(total) => println!("  Total pages reported by site: {}", total),
        None => println!("  Total pages reported by site: unknown"),
    }
    match &report.outcome {
        CrawlOutcome::Completed => println!("  Outcome: completed"),
        CrawlOutcome::Aborted { reason } => println!("  Outcome: aborted ({})", reason),
    }
    println!();

    println!("Detail pages:");
    println!("  Fetched: {}", report.stats.fetched);
    println!("  From cache: {}", report.stats.cached);
    println!("  Failed: {}", report.stats.failed);
    println!();

    println!("Records:");
    println!("  Written: {}", report.records.len());
    println!("  Rejected by validation: {}", report.rejected);
    println!("  Duplicates removed: {}", report.duplicates_removed);

    let with_summary = report
        .records
        .iter()
        .filter(|r| !r.first_reader_summary.is_empty())
        .count();
    let coverage = if report.records.is_empty() {
        0.0
    } else {
        (with_summary as f64 / report.records.len() as f64) * 100.0
    };
    println!(
        "  With First Reader Summary: {} ({:.1}%)",
        with_summary, coverage
    );
}
