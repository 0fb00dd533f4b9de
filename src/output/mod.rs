//! Output module for writing the bill dataset
//!
//! This module handles:
//! - Rendering records as a bare JSON array or as the pipeline envelope
//! - Writing the output file (parent directories are created)
//! - Recording and printing run statistics

pub mod stats;

pub use stats::{print_statistics, CrawlStats, StatsSnapshot};

use crate::config::OutputFormat;
use crate::record::BillRecord;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The wrapped output shape consumed by the frontend pipeline
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub generated_at: String,
    pub source: &'a str,
    pub state: &'static str,
    pub bill_count: usize,
    pub bills_with_summaries: usize,
    pub bills: &'a [BillRecord],
}

impl<'a> Envelope<'a> {
    pub fn new(records: &'a [BillRecord], source: &'a str) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            source,
            state: "GA",
            bill_count: records.len(),
            bills_with_summaries: records.iter().filter(|r| r.has_ai_summary()).count(),
            bills: records,
        }
    }
}

/// Renders records as pretty-printed JSON in the requested format
///
/// `serde_json` never escapes non-ASCII characters, so names and captions are
/// written as UTF-8.
pub fn render_output(
    records: &[BillRecord],
    format: OutputFormat,
    source: &str,
) -> Result<String, OutputError> {
    let json = match format {
        OutputFormat::Array => serde_json::to_string_pretty(records)?,
        OutputFormat::Envelope => serde_json::to_string_pretty(&Envelope::new(records, source))?,
    };
    Ok(json)
}

/// Writes records to `path`, creating parent directories as needed
pub fn write_output(
    path: &Path,
    records: &[BillRecord],
    format: OutputFormat,
    source: &str,
) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = render_output(records, format, source)?;
    std::fs::write(path, json).map_err(io_err)?;

    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
