//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PaginationState`: where the listing walk is (loading, extracted, advancing, done, aborted)

mod pagination_state;

pub use pagination_state::PaginationState;
