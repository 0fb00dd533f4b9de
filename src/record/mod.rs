//! Bill record model
//!
//! A [`BillRecord`] is assembled from a listing table row ([`ListingRow`]) and
//! the content of the bill's detail page ([`DetailContent`]). Field order here
//! is the field order of the output JSON.

mod dates;
mod validation;

pub use dates::normalize_date;
pub use validation::{dedup_by_doc_number, validate_record, ValidationError};

use serde::{Deserialize, Serialize};

/// One bill as written to the output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillRecord {
    /// Identifier such as "HB1" or "SR42"; unique across the output
    pub doc_number: String,
    pub caption: String,
    #[serde(default)]
    pub committees: Vec<String>,
    pub sponsors: Vec<String>,
    pub detail_url: String,
    #[serde(default)]
    pub first_reader_summary: String,
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,

    /// Filled by the downstream summarizer, never by the scraper
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_model: Option<String>,
}

impl BillRecord {
    /// Merges a listing row with its detail page content
    pub fn from_parts(row: ListingRow, detail: DetailContent) -> Self {
        Self {
            doc_number: row.doc_number,
            caption: row.caption,
            committees: row.committees,
            sponsors: row.sponsors,
            detail_url: row.detail_url,
            first_reader_summary: detail.first_reader_summary,
            status_history: detail.status_history,
            ai_summary: None,
            summary_model: None,
        }
    }

    /// True when the downstream summarizer has attached a summary
    pub fn has_ai_summary(&self) -> bool {
        self.ai_summary
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }
}

/// A dated entry from a bill's Status History table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// `YYYY-MM-DD` when the source date parsed, otherwise the raw text
    pub date: String,
    pub status: String,
}

impl StatusEntry {
    /// Builds an entry, normalizing the date
    pub fn new(raw_date: &str, status: impl Into<String>) -> Self {
        Self {
            date: normalize_date(raw_date),
            status: status.into(),
        }
    }
}

/// Content extracted from a detail page; also the detail cache's value type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailContent {
    #[serde(default)]
    pub first_reader_summary: String,
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
}

impl DetailContent {
    /// The sentinel stored when a detail page could not be read
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.first_reader_summary.is_empty() && self.status_history.is_empty()
    }
}

/// One row of the bill listing table, before detail enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub doc_number: String,
    pub caption: String,
    pub committees: Vec<String>,
    pub sponsors: Vec<String>,
    /// Absolute URL of the bill's detail page
    pub detail_url: String,
}
