//! Listing page extractor
//!
//! This module turns the rendered bill listing into [`ListingRow`]s and reads
//! the pagination hints the page exposes:
//! - the "X-Y of Z" result range, from which the page count is derived
//! - numbered page links, used as a last-resort pagination control

use crate::crawler::dom::{inline_text, select_all, select_first};
use crate::record::ListingRow;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use url::Url;

/// Reasons a table row does not produce a [`ListingRow`]
#[derive(Debug, Clone, PartialEq, Eq)]
enum RowSkip {
    TooFewCells(usize),
    MissingLink,
    UnresolvableLink(String),
    EmptyIdentifier,
}

/// Extracts every bill row from a rendered listing page
///
/// Rows come from `table tbody tr`; if the page has none, every `table tr`
/// except the first (header) row is used. Malformed rows are skipped and
/// logged at debug level.
pub fn extract_rows(html: &str, base_url: &Url) -> Vec<ListingRow> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut table_rows = select_all(root, "table tbody tr");
    if table_rows.is_empty() {
        table_rows = select_all(root, "table tr").into_iter().skip(1).collect();
    }

    let mut rows = Vec::with_capacity(table_rows.len());
    for (index, row) in table_rows.into_iter().enumerate() {
        match parse_row(row, base_url) {
            Ok(parsed) => rows.push(parsed),
            Err(RowSkip::EmptyIdentifier) => {}
            Err(reason) => {
                tracing::debug!("Skipping listing row {}: {:?}", index, reason);
            }
        }
    }
    rows
}

fn parse_row(row: ElementRef<'_>, base_url: &Url) -> Result<ListingRow, RowSkip> {
    let cells = select_all(row, "td");
    if cells.len() < 4 {
        return Err(RowSkip::TooFewCells(cells.len()));
    }

    let link = select_first(cells[0], "a[href]").ok_or(RowSkip::MissingLink)?;
    let href = link.value().attr("href").unwrap_or_default();
    let detail_url =
        resolve_link(href, base_url).ok_or_else(|| RowSkip::UnresolvableLink(href.to_string()))?;

    // "HB 1" and "HB1" must name the same bill
    let doc_number: String = link
        .text()
        .flat_map(|t| t.chars())
        .filter(|c| !c.is_whitespace())
        .collect();
    if doc_number.is_empty() {
        return Err(RowSkip::EmptyIdentifier);
    }

    let caption = select_first(cells[1], "a")
        .map(inline_text)
        .unwrap_or_default();

    Ok(ListingRow {
        doc_number,
        caption,
        committees: anchor_texts(cells[2]),
        sponsors: anchor_texts(cells[3]),
        detail_url,
    })
}

fn anchor_texts(cell: ElementRef<'_>) -> Vec<String> {
    select_all(cell, "a")
        .into_iter()
        .map(inline_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}

/// The "X-Y of Z" range shown above the listing table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRange {
    pub first: u32,
    pub last: u32,
    pub total: u32,
}

impl ResultRange {
    pub fn items_per_page(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn total_pages(&self) -> u32 {
        self.total.div_ceil(self.items_per_page())
    }
}

fn result_range_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d+)\s*-\s*(\d+)\s+of\s+(\d[\d,]*)").ok())
        .as_ref()
}

/// Finds the first "X-Y of Z" text on the page
///
/// Ranges where `Y < X` are ignored.
pub fn discover_result_range(html: &str) -> Option<ResultRange> {
    let document = Html::parse_document(html);
    let text = document.root_element().text().collect::<Vec<_>>().join(" ");
    let pattern = result_range_pattern()?;

    pattern.captures_iter(&text).find_map(|caps| {
        let first: u32 = caps[1].parse().ok()?;
        let last: u32 = caps[2].parse().ok()?;
        let total: u32 = caps[3].replace(',', "").parse().ok()?;
        (first >= 1 && last >= first).then_some(ResultRange { first, last, total })
    })
}

/// Returns the highest page number among numbered pagination links
///
/// Looks at `a[href*="page"]` first, then at `.pagination a`. Only link texts
/// that are purely digits count.
pub fn highest_page_link(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let numbered = |css: &str| {
        select_all(root, css)
            .into_iter()
            .map(inline_text)
            .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|t| t.parse::<u32>().ok())
            .max()
    };

    numbered(r#"a[href*="page"]"#).or_else(|| numbered(".pagination a"))
}
