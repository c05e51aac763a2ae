//! Session events and their observers

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::api::errors::{Error, Result};
use crate::api::models::TokenSet;
use crate::api::resilience::RateLimits;
use crate::api::transport::Method;

/// Outcome an observer reports for a stoppable event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Not handled here; ask the next observer
    Continue,
    /// Handled; later observers are skipped and the action goes ahead
    Handled,
    /// Refused; later observers are skipped and the action is rejected
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCause {
    /// First token set, obtained with an authorization code
    Exchanged,
    Refreshed,
}

/// New tokens that must be persisted before they are lost
#[derive(Debug, Clone)]
pub struct CredentialsChanged {
    pub tokens: TokenSet,
    pub cause: TokenCause,
}

/// The division used for requests is about to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisionChanged {
    pub previous: Option<i64>,
    pub current: i64,
}

/// A request is about to go out while a budget is exhausted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitReached {
    pub limits: RateLimits,
    pub method: Method,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitsUpdated {
    pub limits: RateLimits,
}

/// Runs while the session holds its token lock; calls that need a token
/// from the same session wait until the observer returns.
#[async_trait]
pub trait CredentialsObserver: Send + Sync {
    async fn credentials_changed(&self, event: &CredentialsChanged);
}

/// Runs before the new division takes effect. The session may be read from
/// here (`current_division` still reports `previous`), but switching the
/// division again waits on the change in progress.
#[async_trait]
pub trait DivisionObserver: Send + Sync {
    async fn division_changed(&self, event: &DivisionChanged);
}

#[async_trait]
pub trait RateLimitObserver: Send + Sync {
    /// Return [`Propagation::Handled`] to let the request go out anyway
    async fn rate_limit_reached(&self, event: &RateLimitReached) -> Propagation;

    async fn rate_limits_updated(&self, _event: &RateLimitsUpdated) {}
}

/// Typed observer lists, one per event kind
#[derive(Clone, Default)]
pub struct EventDispatcher {
    credentials: Vec<Arc<dyn CredentialsObserver>>,
    division: Vec<Arc<dyn DivisionObserver>>,
    rate_limit: Vec<Arc<dyn RateLimitObserver>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_credentials_observer(&mut self, observer: Arc<dyn CredentialsObserver>) {
        self.credentials.push(observer);
    }

    pub fn add_division_observer(&mut self, observer: Arc<dyn DivisionObserver>) {
        self.division.push(observer);
    }

    pub fn add_rate_limit_observer(&mut self, observer: Arc<dyn RateLimitObserver>) {
        self.rate_limit.push(observer);
    }

    /// Refreshed tokens would be lost without a credentials observer
    pub fn ensure_mandatory(&self) -> Result<()> {
        if self.credentials.is_empty() {
            return Err(Error::MissingListener {
                event: "credentials_changed",
            });
        }
        Ok(())
    }

    pub async fn credentials_changed(&self, event: &CredentialsChanged) {
        debug!(
            "Dispatching credentials change ({:?}) to {} observer(s)",
            event.cause,
            self.credentials.len()
        );
        for observer in &self.credentials {
            observer.credentials_changed(event).await;
        }
    }

    pub async fn division_changed(&self, event: &DivisionChanged) {
        for observer in &self.division {
            observer.division_changed(event).await;
        }
    }

    /// First non-[`Continue`](Propagation::Continue) answer wins
    pub async fn rate_limit_reached(&self, event: &RateLimitReached) -> Propagation {
        for observer in &self.rate_limit {
            match observer.rate_limit_reached(event).await {
                Propagation::Continue => continue,
                decided => return decided,
            }
        }
        Propagation::Continue
    }

    pub async fn rate_limits_updated(&self, event: &RateLimitsUpdated) {
        for observer in &self.rate_limit {
            observer.rate_limits_updated(event).await;
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("credentials", &self.credentials.len())
            .field("division", &self.division.len())
            .field("rate_limit", &self.rate_limit.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Propagation, AtomicUsize);

    #[async_trait]
    impl RateLimitObserver for Fixed {
        async fn rate_limit_reached(&self, _event: &RateLimitReached) -> Propagation {
            self.1.fetch_add(1, Ordering::SeqCst);
            self.0
        }
    }

    fn reached() -> RateLimitReached {
        RateLimitReached {
            limits: RateLimits::default(),
            method: Method::Get,
            url: "https://start.exactonline.nl/api/v1/1/crm/Accounts".into(),
        }
    }

    #[test]
    fn test_mandatory_credentials_observer() {
        let dispatcher = EventDispatcher::new();
        assert!(matches!(
            dispatcher.ensure_mandatory(),
            Err(Error::MissingListener { event: "credentials_changed" })
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_propagation_stops_at_first_decision() {
        let mut dispatcher = EventDispatcher::new();
        assert_eq!(dispatcher.rate_limit_reached(&reached()).await, Propagation::Continue);

        let first = Arc::new(Fixed(Propagation::Continue, AtomicUsize::new(0)));
        let second = Arc::new(Fixed(Propagation::Deny, AtomicUsize::new(0)));
        let third = Arc::new(Fixed(Propagation::Handled, AtomicUsize::new(0)));
        dispatcher.add_rate_limit_observer(first.clone());
        dispatcher.add_rate_limit_observer(second.clone());
        dispatcher.add_rate_limit_observer(third.clone());

        assert_eq!(dispatcher.rate_limit_reached(&reached()).await, Propagation::Deny);
        assert_eq!(first.1.load(Ordering::SeqCst), 1);
        assert_eq!(second.1.load(Ordering::SeqCst), 1);
        assert_eq!(third.1.load(Ordering::SeqCst), 0);
    }
}
