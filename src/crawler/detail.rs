//! Detail page extractor
//!
//! Pulls the First Reader Summary and Status History out of a rendered bill
//! detail page. Both sections are located by their heading text, and the
//! content is searched for relative to that heading because the markup around
//! it has changed between site revisions.

use crate::crawler::dom::{
    block_text, find_heading, following_elements, has_class_fragment, is_heading,
    next_element_sibling, parent_element, select_all,
};
use crate::record::{DetailContent, StatusEntry};
use scraper::{ElementRef, Html};

const SUMMARY_HEADING: &str = "First Reader Summary";
const HISTORY_HEADING: &str = "Status History";

/// Extracts summary and status history from a detail page
///
/// Missing sections leave their fields empty; this never fails.
pub fn extract_detail(html: &str) -> DetailContent {
    let document = Html::parse_document(html);

    DetailContent {
        first_reader_summary: extract_summary(&document).unwrap_or_default(),
        status_history: extract_history(&document),
    }
}

fn extract_summary(document: &Html) -> Option<String> {
    let heading = find_heading(document, SUMMARY_HEADING)?;

    summary_candidates(document, heading)
        .into_iter()
        .flatten()
        .filter(|candidate| !is_heading(*candidate))
        .map(block_text)
        .find(|text| !text.is_empty())
}

/// Places the summary text has been found, in order of preference
fn summary_candidates<'a>(document: &'a Html, heading: ElementRef<'a>) -> [Option<ElementRef<'a>>; 3] {
    let sibling = next_element_sibling(heading);

    // Heading wrapped one level deep, e.g. <div><h2>..</h2></div><div>text</div>
    let parent_sibling = if sibling.is_none() {
        parent_element(heading).and_then(next_element_sibling)
    } else {
        None
    };

    let card_text = following_elements(document, heading)
        .find(|element| has_class_fragment(*element, "card-text"));

    [sibling, parent_sibling, card_text]
}

fn extract_history(document: &Html) -> Vec<StatusEntry> {
    let Some(heading) = find_heading(document, HISTORY_HEADING) else {
        return Vec::new();
    };
    let Some(table) =
        following_elements(document, heading).find(|element| element.value().name() == "table")
    else {
        return Vec::new();
    };

    let mut rows = select_all(table, "tbody tr");
    if rows.is_empty() {
        rows = select_all(table, "tr");
    }

    rows.into_iter()
        .filter_map(|row| {
            let cells = select_all(row, "td");
            if cells.len() < 2 {
                return None;
            }
            let status = block_text(cells[1]);
            if status.is_empty() {
                return None;
            }
            Some(StatusEntry::new(&block_text(cells[0]), status))
        })
        .collect()
}
