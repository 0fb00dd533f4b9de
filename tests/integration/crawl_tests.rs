//! Integration tests for the scraper
//!
//! The listing and detail tabs are in-memory fakes (see `support`), so these
//! tests drive the full coordinator, pagination driver, fetcher and cache
//! without a browser. wiremock stands in for the site during the
//! connectivity probe.

mod support;

use ga_bill_scraper::config::Config;
use ga_bill_scraper::crawler::{
    build_http_client, probe_connection, Coordinator, CrawlOutcome, CrawlReport,
    PaginationSettings,
};
use ga_bill_scraper::output::CrawlStats;
use ga_bill_scraper::storage::DetailCache;
use ga_bill_scraper::ScrapeError;
use std::sync::Arc;
use support::{
    detail_page, listing_page, listing_page_with_links, test_config, Controls, FakeSession,
    FakeSite, SessionLog, LISTING_URL,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Run {
    report: CrawlReport,
    listing: Arc<std::sync::Mutex<SessionLog>>,
    detail: Arc<std::sync::Mutex<SessionLog>>,
}

/// Runs one crawl over `site` and hands back the report and tab logs
async fn crawl(site: Arc<FakeSite>, config: &Config) -> Run {
    let listing = FakeSession::new(Arc::clone(&site));
    let detail = FakeSession::new(site);
    let listing_log = Arc::clone(&listing.log);
    let detail_log = Arc::clone(&detail.log);

    let stats = Arc::new(CrawlStats::new());
    let cache = DetailCache::load(&config.output.cache_path, Arc::clone(&stats));
    let settings = PaginationSettings::from_config(config).unwrap();

    let mut coordinator = Coordinator::new(config, settings, listing, detail, cache, stats);
    let report = coordinator.run().await;

    Run {
        report,
        listing: listing_log,
        detail: detail_log,
    }
}

fn two_bill_detail_site(listing_pages: Vec<String>) -> FakeSite {
    FakeSite::new(listing_pages)
        .with_detail(
            "/legislation/1",
            detail_page(
                "A BILL to amend Title 20.",
                &[("01/15/2024", "House First Readers"), ("01/16/2024", "House Second Readers")],
            ),
        )
        .with_detail(
            "/legislation/2",
            detail_page("Relating to motor vehicles.", &[("02/01/2024", "Senate Passed")]),
        )
}

#[tokio::test]
async fn test_single_page_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let page = listing_page(
        Some("1-2 of 2"),
        &[
            ("HB 1", "/legislation/1", "Smith, John"),
            ("HB 2", "/legislation/2", "Jones, Amy"),
        ],
    );
    let site = Arc::new(two_bill_detail_site(vec![page]));

    let run = crawl(site, &config).await;
    let report = run.report;

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.pages_scraped, 1);
    assert_eq!(report.total_pages, Some(1));
    assert_eq!(report.records.len(), 2);

    let first = &report.records[0];
    assert_eq!(first.doc_number, "HB1");
    assert_eq!(first.caption, "Caption of HB 1");
    assert_eq!(first.sponsors, vec!["Smith, John"]);
    assert_eq!(first.committees, vec!["Judiciary"]);
    assert_eq!(first.detail_url, "https://www.legis.ga.gov/legislation/1");
    assert_eq!(first.first_reader_summary, "A BILL to amend Title 20.");
    assert_eq!(first.status_history.len(), 2);
    assert_eq!(first.status_history[0].date, "2024-01-15");
    assert_eq!(first.status_history[1].status, "House Second Readers");

    assert_eq!(report.records[1].status_history[0].date, "2024-02-01");

    // The total was known, so page 2 was never requested
    assert!(run.listing.lock().unwrap().clicks.is_empty());
    assert_eq!(run.listing.lock().unwrap().gotos, vec![LISTING_URL]);
    assert_eq!(report.stats.fetched, 2);
    assert_eq!(report.stats.failed, 0);
}

#[tokio::test]
async fn test_duplicates_across_pages_keep_first() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let page1 = listing_page(
        Some("1-2 of 4"),
        &[
            ("HB 1", "/legislation/1", "Smith, John"),
            ("HB 2", "/legislation/2", "Jones, Amy"),
        ],
    );
    let page2 = listing_page(
        Some("3-4 of 4"),
        &[
            ("HB 2", "/legislation/2", "Someone Else"),
            ("HB 3", "/legislation/3", "Lee, Kim"),
        ],
    );
    let site = Arc::new(
        two_bill_detail_site(vec![page1, page2]).with_detail(
            "/legislation/3",
            detail_page("Provides for tax credits.", &[]),
        ),
    );

    let run = crawl(site, &config).await;
    let report = run.report;

    let docs: Vec<&str> = report.records.iter().map(|r| r.doc_number.as_str()).collect();
    assert_eq!(docs, vec!["HB1", "HB2", "HB3"]);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.records[1].sponsors, vec!["Jones, Amy"]);
    assert_eq!(report.pages_scraped, 2);
    assert_eq!(run.listing.lock().unwrap().clicks, vec!["2"]);

    // The duplicate's detail page came from the cache
    assert_eq!(report.stats.fetched, 3);
    assert_eq!(report.stats.cached, 1);
}

#[tokio::test]
async fn test_consecutive_failures_abort_and_keep_records() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let page1 = listing_page(
        Some("1-2 of 6"),
        &[
            ("HB 1", "/legislation/1", "Smith, John"),
            ("HB 2", "/legislation/2", "Jones, Amy"),
        ],
    );
    let page2 = listing_page(Some("3-4 of 6"), &[("HB 3", "/legislation/3", "Lee, Kim")]);
    let page3 = listing_page(Some("5-6 of 6"), &[("HB 5", "/legislation/5", "Lee, Kim")]);
    let site = Arc::new(two_bill_detail_site(vec![page1, page2, page3]).failing_page(2));

    let report = crawl(site, &config).await.report;

    assert!(report.outcome.is_aborted());
    if let CrawlOutcome::Aborted { reason } = &report.outcome {
        assert!(reason.contains("3 consecutive page failures"));
    }
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.pages_scraped, 1);
}

#[tokio::test]
async fn test_empty_page_counts_as_failure_but_crawl_continues() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let page1 = listing_page(Some("1-1 of 3"), &[("HB 1", "/legislation/1", "Smith, John")]);
    let page2 = listing_page(Some("2-2 of 3"), &[]);
    let page3 = listing_page(Some("3-3 of 3"), &[("HB 2", "/legislation/2", "Jones, Amy")]);
    let site = Arc::new(two_bill_detail_site(vec![page1, page2, page3]));

    let run = crawl(site, &config).await;

    assert_eq!(run.report.outcome, CrawlOutcome::Completed);
    assert_eq!(run.report.records.len(), 2);
    assert_eq!(run.report.pages_scraped, 2);
    assert_eq!(run.listing.lock().unwrap().clicks, vec!["2", "3"]);
}

#[tokio::test]
async fn test_cache_persists_across_runs() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));
    let page = listing_page(
        Some("1-2 of 2"),
        &[
            ("HB 1", "/legislation/1", "Smith, John"),
            ("HB 2", "/legislation/2", "Jones, Amy"),
        ],
    );
    let site = Arc::new(two_bill_detail_site(vec![page]));

    let first = crawl(Arc::clone(&site), &config).await;
    assert_eq!(first.report.stats.fetched, 2);
    assert!(config.output.cache_path.exists());

    let second = crawl(site, &config).await;
    assert_eq!(second.report.stats.fetched, 0);
    assert_eq!(second.report.stats.cached, 2);
    assert!(second.detail.lock().unwrap().gotos.is_empty());
    assert_eq!(first.report.records, second.report.records);
}

#[tokio::test]
async fn test_detail_retry_then_success() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));
    let page = listing_page(Some("1-1 of 1"), &[("HB 1", "/legislation/1", "Smith, John")]);
    let site = Arc::new(two_bill_detail_site(vec![page]).failing_detail("/legislation/1", 2));

    let run = crawl(site, &config).await;

    assert_eq!(run.detail.lock().unwrap().gotos.len(), 3);
    assert_eq!(
        run.report.records[0].first_reader_summary,
        "A BILL to amend Title 20."
    );
    assert_eq!(run.report.stats.failed, 0);
}

#[tokio::test]
async fn test_detail_exhaustion_yields_empty_sentinel() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("cache.json");
    let config = test_config(&cache_path);
    let page = listing_page(Some("1-1 of 1"), &[("HB 1", "/legislation/1", "Smith, John")]);
    let site = Arc::new(two_bill_detail_site(vec![page]).failing_detail("/legislation/1", 5));

    let run = crawl(site, &config).await;
    let report = run.report;

    assert_eq!(run.detail.lock().unwrap().gotos.len(), 3);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].first_reader_summary.is_empty());
    assert!(report.records[0].status_history.is_empty());

    // The sentinel is cached so the next run does not retry
    let cached = std::fs::read_to_string(&cache_path).unwrap();
    assert!(cached.contains("https://www.legis.ga.gov/legislation/1"));
}

#[tokio::test]
async fn test_row_without_sponsors_is_dropped() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));
    let page = listing_page(
        Some("1-2 of 2"),
        &[
            ("HB 1", "/legislation/1", "Smith, John"),
            ("HB 2", "/legislation/2", ""),
        ],
    );
    let site = Arc::new(two_bill_detail_site(vec![page]));

    let report = crawl(site, &config).await.report;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].doc_number, "HB1");
    assert_eq!(report.rejected, 1);
}

#[tokio::test]
async fn test_max_pages_bound() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir.path().join("cache.json"));
    config.crawler.max_pages = Some(2);

    let pages = vec![
        listing_page(Some("1-1 of 3"), &[("HB 1", "/legislation/1", "Smith, John")]),
        listing_page(Some("2-2 of 3"), &[("HB 2", "/legislation/2", "Jones, Amy")]),
        listing_page(Some("3-3 of 3"), &[("HB 3", "/legislation/3", "Lee, Kim")]),
    ];
    let site = Arc::new(two_bill_detail_site(pages));

    let run = crawl(site, &config).await;

    assert_eq!(run.report.pages_scraped, 2);
    assert_eq!(run.report.records.len(), 2);
    assert_eq!(run.listing.lock().unwrap().clicks, vec!["2"]);
}

#[tokio::test]
async fn test_walks_pages_without_result_range_until_no_control() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let pages = vec![
        listing_page(None, &[("HB 1", "/legislation/1", "Smith, John")]),
        listing_page(None, &[("HB 2", "/legislation/2", "Jones, Amy")]),
    ];
    let site = Arc::new(two_bill_detail_site(pages));

    let run = crawl(site, &config).await;

    assert_eq!(run.report.outcome, CrawlOutcome::Completed);
    assert_eq!(run.report.total_pages, None);
    assert_eq!(run.report.pages_scraped, 2);
    assert_eq!(run.report.records.len(), 2);
    assert_eq!(run.listing.lock().unwrap().clicks, vec!["2"]);
}

fn three_bill_site(pages: Vec<String>) -> FakeSite {
    two_bill_detail_site(pages).with_detail(
        "/legislation/3",
        detail_page("Provides for tax credits.", &[("03/04/2024", "Effective Date")]),
    )
}

fn one_bill_per_page(total: Option<&str>) -> Vec<String> {
    let ranges = total.map(|t| {
        [
            format!("1-1 of {}", t),
            format!("2-2 of {}", t),
            format!("3-3 of {}", t),
        ]
    });
    [
        ("HB 1", "/legislation/1", "Smith, John"),
        ("HB 2", "/legislation/2", "Jones, Amy"),
        ("HB 3", "/legislation/3", "Lee, Kim"),
    ]
    .iter()
    .enumerate()
    .map(|(i, row)| listing_page(ranges.as_ref().map(|r| r[i].as_str()), &[*row]))
    .collect()
}

#[tokio::test]
async fn test_late_render_is_accepted_on_retry() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    // Page 2 keeps showing page 1 for every poll after the click
    let polls = config.crawler.content_change_polls;
    let site = Arc::new(three_bill_site(one_bill_per_page(Some("3"))).slow_page(2, polls));

    let run = crawl(site, &config).await;
    let report = run.report;

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    let docs: Vec<&str> = report.records.iter().map(|r| r.doc_number.as_str()).collect();
    assert_eq!(docs, vec!["HB1", "HB2", "HB3"]);
    assert_eq!(report.pages_scraped, 3);
    assert_eq!(run.listing.lock().unwrap().clicks, vec!["2", "3"]);
}

#[tokio::test]
async fn test_next_text_control_advances() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let mut pages = one_bill_per_page(Some("2"));
    pages.truncate(2);
    let site = Arc::new(two_bill_detail_site(pages).with_controls(Controls::NextText));

    let run = crawl(site, &config).await;

    assert_eq!(run.report.outcome, CrawlOutcome::Completed);
    assert_eq!(run.report.records.len(), 2);
    assert_eq!(run.listing.lock().unwrap().clicks, vec!["Next"]);
}

#[tokio::test]
async fn test_icon_next_link_advances() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let site = Arc::new(
        three_bill_site(one_bill_per_page(None)).with_controls(Controls::NextSelector),
    );

    let run = crawl(site, &config).await;

    assert_eq!(run.report.outcome, CrawlOutcome::Completed);
    assert_eq!(run.report.pages_scraped, 3);
    assert_eq!(
        run.listing.lock().unwrap().clicks,
        vec![r#"a[rel="next"]"#, r#"a[rel="next"]"#]
    );
}

#[tokio::test]
async fn test_highest_visible_link_skips_ahead() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let pages = vec![
        listing_page_with_links(None, &[("HB 1", "/legislation/1", "Smith, John")], &[3]),
        listing_page(None, &[("HB 2", "/legislation/2", "Jones, Amy")]),
        listing_page(None, &[("HB 3", "/legislation/3", "Lee, Kim")]),
    ];
    let site = Arc::new(three_bill_site(pages).with_controls(Controls::NumberedOnly(vec![3])));

    let run = crawl(site, &config).await;
    let report = run.report;

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    let docs: Vec<&str> = report.records.iter().map(|r| r.doc_number.as_str()).collect();
    assert_eq!(docs, vec!["HB1", "HB3"]);
    assert_eq!(report.pages_scraped, 2);
    assert_eq!(run.listing.lock().unwrap().clicks, vec!["3"]);
}

#[tokio::test]
async fn test_click_without_change_counts_as_failure() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let mut pages = one_bill_per_page(Some("2"));
    pages.truncate(2);
    let site = Arc::new(two_bill_detail_site(pages).with_controls(Controls::Inert));

    let run = crawl(site, &config).await;
    let report = run.report;

    match &report.outcome {
        CrawlOutcome::Aborted { reason } => assert!(reason.contains("could not advance")),
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.pages_scraped, 1);
    assert_eq!(run.listing.lock().unwrap().clicks, vec!["2", "2", "2"]);
}

#[tokio::test]
async fn test_click_without_change_ends_walk_when_total_unknown() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let site = Arc::new(three_bill_site(one_bill_per_page(None)).with_controls(Controls::Inert));

    let run = crawl(site, &config).await;

    assert_eq!(run.report.outcome, CrawlOutcome::Completed);
    assert_eq!(run.report.records.len(), 1);
    assert_eq!(run.listing.lock().unwrap().clicks, vec!["2"]);
}

#[tokio::test]
async fn test_listing_navigation_failures_abort() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let site = Arc::new(three_bill_site(one_bill_per_page(Some("3"))).failing_listing(3));

    let run = crawl(site, &config).await;
    let report = run.report;

    match &report.outcome {
        CrawlOutcome::Aborted { reason } => {
            assert!(reason.contains("3 consecutive page failures, last on page 1"))
        }
        other => panic!("expected abort, got {:?}", other),
    }
    assert!(report.records.is_empty());
    assert_eq!(report.pages_scraped, 0);
    assert_eq!(run.listing.lock().unwrap().gotos, vec![LISTING_URL; 3]);
    assert!(run.detail.lock().unwrap().gotos.is_empty());
}

#[tokio::test]
async fn test_listing_navigation_recovers_before_threshold() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("cache.json"));

    let page = listing_page(Some("1-1 of 1"), &[("HB 1", "/legislation/1", "Smith, John")]);
    let site = Arc::new(two_bill_detail_site(vec![page]).failing_listing(2));

    let run = crawl(site, &config).await;

    assert_eq!(run.report.outcome, CrawlOutcome::Completed);
    assert_eq!(run.report.records.len(), 1);
    assert_eq!(run.listing.lock().unwrap().gotos, vec![LISTING_URL; 3]);
}

#[tokio::test]
async fn test_probe_connection_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&mock_server)
        .await;

    let client = build_http_client(&Config::default().browser).unwrap();
    let result = probe_connection(&client, &format!("{}/", mock_server.uri())).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_probe_connection_failure_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = build_http_client(&Config::default().browser).unwrap();
    let result = probe_connection(&client, &mock_server.uri()).await;

    match result {
        Err(ScrapeError::Connectivity { message, .. }) => assert!(message.contains("503")),
        other => panic!("expected connectivity error, got {:?}", other),
    }
}
