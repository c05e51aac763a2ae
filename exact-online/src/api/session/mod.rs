//! Authenticated session against one administration
//!
//! The session owns the OAuth token lifecycle, the active division and the
//! last reported rate limits. It persists none of them; every change is
//! published through [`EventDispatcher`] observers instead.

mod auth;
pub mod builder;
pub mod client;
pub mod events;
pub mod state;

pub use builder::SessionBuilder;
pub use client::Session;
pub use events::{
    CredentialsChanged, CredentialsObserver, DivisionChanged, DivisionObserver, EventDispatcher,
    Propagation, RateLimitObserver, RateLimitReached, RateLimitsUpdated, TokenCause,
};
pub use state::SessionStatus;
