//! Storage module for persisting crawl data
//!
//! The only persistent state is the detail page cache, which lets a rerun skip
//! every bill detail page it has already rendered.

mod detail_cache;

pub use detail_cache::{DetailCache, StorageError, StorageResult};
