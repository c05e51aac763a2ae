//! Session assembly

use std::sync::Arc;

use log::debug;
use secrecy::SecretString;
use tokio::sync::Mutex;

use super::client::{Inner, Session};
use super::events::{CredentialsObserver, DivisionObserver, EventDispatcher, RateLimitObserver};
use super::state::AuthState;
use crate::api::errors::{Error, Result};
use crate::api::metadata::MetadataRegistry;
use crate::api::models::{CredentialProvider, TokenSet};
use crate::api::resilience::RateLimits;
use crate::api::transport::Transport;
use crate::config::SessionConfig;

/// Builder for [`Session`]
///
/// Previously persisted tokens, division and rate limits can be restored
/// here; the session itself never loads them.
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<SessionConfig>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    transport: Option<Arc<dyn Transport>>,
    registry: Option<Arc<MetadataRegistry>>,
    events: EventDispatcher,
    tokens: Option<TokenSet>,
    authorization_code: Option<SecretString>,
    division: Option<i64>,
    rate_limits: RateLimits,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn credentials(self, credentials: impl CredentialProvider + 'static) -> Self {
        self.credential_provider(Arc::new(credentials))
    }

    pub fn credential_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn transport(self, transport: impl Transport + 'static) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Defaults to a registry with the built-in schemas
    pub fn registry(mut self, registry: Arc<MetadataRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn on_credentials_changed(mut self, observer: Arc<dyn CredentialsObserver>) -> Self {
        self.events.add_credentials_observer(observer);
        self
    }

    pub fn on_division_changed(mut self, observer: Arc<dyn DivisionObserver>) -> Self {
        self.events.add_division_observer(observer);
        self
    }

    pub fn on_rate_limit(mut self, observer: Arc<dyn RateLimitObserver>) -> Self {
        self.events.add_rate_limit_observer(observer);
        self
    }

    pub fn tokens(mut self, tokens: TokenSet) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn authorization_code(mut self, code: impl Into<String>) -> Self {
        self.authorization_code = Some(SecretString::from(code.into()));
        self
    }

    pub fn division(mut self, division: i64) -> Self {
        self.division = Some(division);
        self
    }

    pub fn rate_limits(mut self, rate_limits: RateLimits) -> Self {
        self.rate_limits = rate_limits;
        self
    }

    pub fn build(self) -> Result<Session> {
        self.events.ensure_mandatory()?;

        let credentials = self
            .credentials
            .ok_or_else(|| Error::Config("credentials are required".into()))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        let config = self.config.unwrap_or_default();

        debug!(
            "Building session for {} (tokens restored: {}, division: {:?})",
            config.base_url,
            self.tokens.is_some(),
            self.division
        );

        Ok(Session::from_inner(Inner {
            config,
            credentials,
            transport,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(MetadataRegistry::with_builtin_schemas())),
            events: self.events,
            auth: Mutex::new(AuthState {
                tokens: self.tokens,
                authorization_code: self.authorization_code,
            }),
            division: Mutex::new(self.division),
            division_switch: Mutex::new(()),
            rate_limits: Mutex::new(self.rate_limits),
        }))
    }
}

#[cfg(feature = "reqwest-transport")]
fn default_transport() -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(crate::api::transport::ReqwestTransport::default()))
}

#[cfg(not(feature = "reqwest-transport"))]
fn default_transport() -> Result<Arc<dyn Transport>> {
    Err(Error::Config("a transport is required".into()))
}
