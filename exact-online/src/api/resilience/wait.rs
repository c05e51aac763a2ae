//! Rate-limit observer that waits out an exhausted window

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::info;

use crate::api::session::{Propagation, RateLimitObserver, RateLimitReached};

/// Sleeps until the reported reset instant, then lets the request proceed
///
/// Gives up (leaving the request to be rejected) when the reset is unknown
/// or further away than `max_wait`, e.g. an exhausted daily budget.
#[derive(Debug, Clone, Copy)]
pub struct WaitForReset {
    max_wait: Duration,
}

impl WaitForReset {
    pub fn new(max_wait: Duration) -> Self {
        Self { max_wait }
    }

    /// How long to wait for `event`, if at all
    pub fn wait_for(&self, event: &RateLimitReached) -> Option<Duration> {
        let resume_at = event.limits.resume_at()?;
        let wait = (resume_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        (wait <= self.max_wait).then_some(wait)
    }
}

impl Default for WaitForReset {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl RateLimitObserver for WaitForReset {
    async fn rate_limit_reached(&self, event: &RateLimitReached) -> Propagation {
        match self.wait_for(event) {
            Some(wait) => {
                info!("Rate limit reached, waiting {:?} for reset", wait);
                tokio::time::sleep(wait).await;
                Propagation::Handled
            }
            None => Propagation::Continue,
        }
    }
}
