/// Pagination state definitions for the listing crawl
///
/// The listing is walked as a small state machine. Each page is loaded, its rows
/// handed to the caller, and then the driver tries to move the tab to the next page.
use std::fmt;

/// Represents where the pagination driver is in the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaginationState {
    // ===== Active States =====
    /// Listing page `n` is (or should be) in the tab and is about to be read
    Loading(u32),

    /// Rows of page `n` were extracted and yielded to the caller
    ExtractedRows(u32),

    /// Trying to move the tab from page `n` to the following page
    Advancing(u32),

    // ===== Terminal States =====
    /// The listing was exhausted or the page bound was reached
    Done,

    /// Too many consecutive page-level failures
    Aborted,
}

impl PaginationState {
    /// Returns true if this is a terminal state (no further pages will be read)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if moving from `self` to `next` is a legal step
    ///
    /// - `Loading(n)` may retry itself, yield rows, skip to advancing after an
    ///   empty page, or stop.
    /// - `ExtractedRows(n)` only moves on to advancing (or stops at a bound).
    /// - `Advancing(n)` moves to a strictly later page, retries itself, or stops.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        use PaginationState::*;

        match (*self, *next) {
            (Loading(n), Loading(m)) => n == m,
            (Loading(n), ExtractedRows(m)) => n == m,
            (Loading(n), Advancing(m)) => n == m,
            (Loading(_), Done | Aborted) => true,

            (ExtractedRows(n), Advancing(m)) => n == m,
            (ExtractedRows(_), Done) => true,

            (Advancing(n), Loading(m)) => m > n,
            (Advancing(n), Advancing(m)) => n == m,
            (Advancing(_), Done | Aborted) => true,

            _ => false,
        }
    }
}

impl fmt::Display for PaginationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading(n) => write!(f, "loading page {}", n),
            Self::ExtractedRows(n) => write!(f, "extracted rows of page {}", n),
            Self::Advancing(n) => write!(f, "advancing from page {}", n),
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}
