//! Rate-limit bookkeeping for the service's daily and per-minute budgets

pub mod rate_limits;
pub mod wait;

pub use rate_limits::{RateLimits, RateWindow};
pub use wait::WaitForReset;
