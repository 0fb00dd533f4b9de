//! Browser module for rendering JavaScript-driven pages
//!
//! The listing and detail pages on legis.ga.gov are built client-side, so
//! every page is read through a real browser tab. The crawler only talks to
//! the [`PageSession`] trait; [`ChromeBrowser`] provides the Chromium
//! implementation over the DevTools protocol.

mod chrome;

pub use chrome::{ChromeBrowser, ChromeSession};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a browser tab
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Timed out after {timeout:?} while {action}")]
    Timeout { action: String, timeout: Duration },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("No element matched {0}")]
    ElementNotFound(String),

    #[error("Browser failure: {0}")]
    Browser(String),
}

impl RenderError {
    /// Returns true if the failure was a deadline rather than an error response
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A single browser tab
///
/// All operations act on the tab's current document. Implementations hold the
/// deadlines for navigation and clicks; `wait_for_selector` takes its own.
#[async_trait]
pub trait PageSession: Send {
    /// Navigates the tab to `url` and waits for the document to load
    async fn goto(&mut self, url: &str) -> Result<(), RenderError>;

    /// Waits until at least one element matches `selector`
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), RenderError>;

    /// Returns the rendered HTML of the current document
    async fn content(&mut self) -> Result<String, RenderError>;

    /// Clicks the first link or button whose visible text matches `label`
    ///
    /// With `exact` the trimmed text must equal `label`; otherwise containing it
    /// is enough.
    async fn click_text(&mut self, label: &str, exact: bool) -> Result<(), RenderError>;

    /// Clicks the first element matching `selector`
    async fn click_selector(&mut self, selector: &str) -> Result<(), RenderError>;

    /// Scrolls the document to the bottom so lazy pagination controls render
    async fn scroll_to_bottom(&mut self) -> Result<(), RenderError>;
}
