//! Server-reported request budgets

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};

use crate::api::constants::{
    HEADER_DAILY_LIMIT, HEADER_DAILY_REMAINING, HEADER_DAILY_RESET, HEADER_MINUTELY_LIMIT,
    HEADER_MINUTELY_REMAINING, HEADER_MINUTELY_RESET,
};
use crate::api::transport::ApiResponse;

/// One budget window as last reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub limit: u64,
    /// Always within `0..=limit`
    pub remaining: u64,
    pub reset: Option<DateTime<Utc>>,
}

impl RateWindow {
    /// Build from raw header values, clamping `remaining` into range
    pub fn new(limit: i64, remaining: i64, reset: Option<DateTime<Utc>>) -> Self {
        let limit = limit.max(0) as u64;
        let remaining = (remaining.max(0) as u64).min(limit);
        Self {
            limit,
            remaining,
            reset,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Exhausted and not yet past its reset instant
    pub fn is_exhausted_at(&self, now: DateTime<Utc>) -> bool {
        self.is_exhausted() && self.reset.is_none_or(|reset| now < reset)
    }

    fn from_headers(
        response: &ApiResponse,
        limit: &str,
        remaining: &str,
        reset: &str,
    ) -> Option<Self> {
        let limit = parse_header(response, limit)?;
        let remaining = parse_header(response, remaining)?;
        let reset = parse_header(response, reset).and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        Some(Self::new(limit, remaining, reset))
    }
}

fn parse_header(response: &ApiResponse, name: &str) -> Option<i64> {
    let raw = response.header(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring malformed {} header: {:?}", name, raw);
            None
        }
    }
}

/// Daily and per-minute budgets; each is unknown until first reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimits {
    pub daily: Option<RateWindow>,
    pub minutely: Option<RateWindow>,
}

impl RateLimits {
    pub fn is_daily_limited(&self) -> bool {
        self.daily.is_some_and(|w| w.is_exhausted())
    }

    pub fn is_minutely_limited(&self) -> bool {
        self.minutely.is_some_and(|w| w.is_exhausted())
    }

    pub fn is_limited(&self) -> bool {
        self.is_daily_limited() || self.is_minutely_limited()
    }

    /// Like [`is_limited`](Self::is_limited), treating windows whose reset
    /// instant has passed as replenished
    pub fn is_limited_at(&self, now: DateTime<Utc>) -> bool {
        [self.daily, self.minutely]
            .into_iter()
            .flatten()
            .any(|w| w.is_exhausted_at(now))
    }

    /// Latest reset among exhausted windows, i.e. when requests may resume
    pub fn resume_at(&self) -> Option<DateTime<Utc>> {
        [self.daily, self.minutely]
            .into_iter()
            .flatten()
            .filter(RateWindow::is_exhausted)
            .map(|w| w.reset)
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .max()
    }

    /// Overwrite each window the response reports; returns whether any was present
    pub fn update_from_headers(&mut self, response: &ApiResponse) -> bool {
        let daily = RateWindow::from_headers(
            response,
            HEADER_DAILY_LIMIT,
            HEADER_DAILY_REMAINING,
            HEADER_DAILY_RESET,
        );
        let minutely = RateWindow::from_headers(
            response,
            HEADER_MINUTELY_LIMIT,
            HEADER_MINUTELY_REMAINING,
            HEADER_MINUTELY_RESET,
        );

        let updated = daily.is_some() || minutely.is_some();
        if let Some(window) = daily {
            self.daily = Some(window);
        }
        if let Some(window) = minutely {
            self.minutely = Some(window);
        }
        if updated {
            debug!(
                "Rate limits updated: daily {:?}/{:?}, minutely {:?}/{:?}",
                self.daily.map(|w| w.remaining),
                self.daily.map(|w| w.limit),
                self.minutely.map(|w| w.remaining),
                self.minutely.map(|w| w.limit),
            );
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn response(headers: &[(&str, &str)]) -> ApiResponse {
        headers
            .iter()
            .fold(ApiResponse::new(200, ""), |r, (name, value)| {
                r.with_header(name, *value)
            })
    }

    #[test]
    fn test_unknown_until_reported() {
        let limits = RateLimits::default();
        assert!(limits.daily.is_none());
        assert!(!limits.is_daily_limited());
        assert!(!limits.is_limited());
        assert!(limits.resume_at().is_none());
    }

    #[test]
    fn test_update_from_headers() {
        let mut limits = RateLimits::default();
        let updated = limits.update_from_headers(&response(&[
            ("X-RateLimit-Limit", "5000"),
            ("X-RateLimit-Remaining", "4999"),
            ("X-RateLimit-Reset", "1709337600000"),
            ("X-RateLimit-Minutely-Limit", "60"),
            ("X-RateLimit-Minutely-Remaining", "59"),
            ("X-RateLimit-Minutely-Reset", "1709296260000"),
        ]));
        assert!(updated);

        let daily = limits.daily.unwrap();
        assert_eq!(daily.limit, 5000);
        assert_eq!(daily.remaining, 4999);
        assert_eq!(daily.reset, Utc.timestamp_millis_opt(1709337600000).single());
        assert_eq!(limits.minutely.unwrap().remaining, 59);

        // A response without headers leaves the known state alone
        assert!(!limits.update_from_headers(&response(&[])));
        assert_eq!(limits.daily, Some(daily));
    }

    #[test]
    fn test_remaining_is_clamped() {
        let mut limits = RateLimits::default();
        limits.update_from_headers(&response(&[
            ("x-ratelimit-limit", "100"),
            ("x-ratelimit-remaining", "-3"),
        ]));
        assert_eq!(limits.daily.unwrap().remaining, 0);
        assert!(limits.is_daily_limited());
        assert!(!limits.is_minutely_limited());

        assert_eq!(RateWindow::new(10, 25, None).remaining, 10);
    }

    #[test]
    fn test_daily_limited_iff_nothing_remaining() {
        for remaining in [-1i64, 0, 1, 50] {
            let limits = RateLimits {
                daily: Some(RateWindow::new(50, remaining, None)),
                minutely: None,
            };
            assert_eq!(limits.is_daily_limited(), remaining <= 0);
        }
    }

    #[test]
    fn test_limited_at_respects_reset() {
        let now = Utc::now();
        let limits = RateLimits {
            daily: None,
            minutely: Some(RateWindow::new(60, 0, Some(now + Duration::seconds(20)))),
        };
        assert!(limits.is_limited_at(now));
        assert!(!limits.is_limited_at(now + Duration::seconds(21)));
        assert_eq!(limits.resume_at(), Some(now + Duration::seconds(20)));
    }

    #[test]
    fn test_malformed_headers_are_ignored() {
        let mut limits = RateLimits::default();
        assert!(!limits.update_from_headers(&response(&[
            ("x-ratelimit-limit", "many"),
            ("x-ratelimit-remaining", "1"),
        ])));
        assert!(limits.daily.is_none());
    }
}
