//! Small query helpers over parsed `scraper` documents
//!
//! Rendered legislature pages are loosely structured, so the extractors lean
//! on document order and sibling relationships more than on fixed selectors.

use scraper::{ElementRef, Html, Selector};

/// Returns every element under `scope` matching `css`, in document order
///
/// An unparseable selector matches nothing.
pub fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Returns the first element under `scope` matching `css`
pub fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

/// Collapses runs of whitespace to single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of an inline element such as a link
pub fn inline_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text of a block element; separate text nodes never run together
pub fn block_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn is_heading(element: ElementRef<'_>) -> bool {
    matches!(
        element.value().name(),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

/// Finds the first `h1`..`h6` whose text contains `needle`
pub fn find_heading<'a>(document: &'a Html, needle: &str) -> Option<ElementRef<'a>> {
    select_all(document.root_element(), "h1, h2, h3, h4, h5, h6")
        .into_iter()
        .find(|heading| inline_text(*heading).contains(needle))
}

pub fn next_element_sibling<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

pub fn parent_element<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.parent().and_then(ElementRef::wrap)
}

/// Every element after `anchor` in document order, starting with its own children
pub fn following_elements<'a>(
    document: &'a Html,
    anchor: ElementRef<'a>,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let anchor_node = *anchor;
    document
        .root_element()
        .descendants()
        .skip_while(move |node| *node != anchor_node)
        .skip(1)
        .filter_map(ElementRef::wrap)
}

/// Returns true if any class on `element` contains `fragment`
pub fn has_class_fragment(element: ElementRef<'_>, fragment: &str) -> bool {
    element.value().classes().any(|class| class.contains(fragment))
}
