//! Persistent detail page cache
//!
//! A JSON object mapping `detail_url -> {first_reader_summary, status_history}`.
//! Every miss is written through to disk immediately, so an interrupted run
//! loses nothing it already fetched.

use crate::output::CrawlStats;
use crate::record::DetailContent;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while persisting the cache
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Detail page cache backed by a single JSON file
pub struct DetailCache {
    path: PathBuf,
    entries: BTreeMap<String, DetailContent>,
    stats: Arc<CrawlStats>,
    /// Cleared after the first failed save; the cache then lives in memory only
    persist: bool,
}

impl DetailCache {
    /// Loads the cache file at `path`
    ///
    /// A missing file starts an empty cache. A file that cannot be read or
    /// parsed is logged and also treated as empty; it will be overwritten by the
    /// first successful save.
    pub fn load(path: impl Into<PathBuf>, stats: Arc<CrawlStats>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(Some(entries)) => {
                tracing::info!(
                    "Loaded {} cached detail pages from {}",
                    entries.len(),
                    path.display()
                );
                entries
            }
            Ok(None) => {
                tracing::debug!("No detail cache at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable detail cache {}: {}",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries,
            stats,
            persist: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&DetailContent> {
        self.entries.get(url)
    }

    /// Returns the cached content for `url`, or fetches, stores and persists it
    ///
    /// Whatever `fetch` returns is stored, including the empty sentinel
    /// produced after exhausted retries.
    pub async fn get_or_fetch<F, Fut>(&mut self, url: &str, fetch: F) -> DetailContent
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = DetailContent>,
    {
        if let Some(hit) = self.entries.get(url) {
            tracing::debug!("Cache hit: {}", url);
            self.stats.record_cached();
            return hit.clone();
        }

        let content = fetch(url.to_string()).await;
        self.entries.insert(url.to_string(), content.clone());
        self.stats.record_fetched();

        if self.persist {
            if let Err(e) = self.save() {
                tracing::warn!(
                    "Failed to write detail cache {}: {}; continuing in memory only",
                    self.path.display(),
                    e
                );
                self.persist = false;
            }
        }

        content
    }

    /// Writes the whole map to disk (temp file, then rename)
    pub fn save(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn read_entries(path: &Path) -> StorageResult<Option<BTreeMap<String, DetailContent>>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}
