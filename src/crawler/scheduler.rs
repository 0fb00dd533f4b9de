//! Request pacing
//!
//! The scraper is sequential, so politeness comes down to keeping a minimum
//! interval between consecutive requests of the same kind. One [`Pacer`] spaces
//! detail page fetches and another spaces listing page advances.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum interval between consecutive requests
#[derive(Debug, Clone)]
pub struct Pacer {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Time left before the next request may go out
    ///
    /// The first request is never delayed.
    pub fn time_until_ready(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => (last + self.min_interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Waits until the interval has passed, then marks a request as sent
    pub async fn pace(&mut self) {
        let wait = self.time_until_ready(Instant::now());
        if !wait.is_zero() {
            tracing::trace!("Pacing: waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
        self.last = Some(Instant::now());
    }
}
