//! Authenticated requests against entity endpoints

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use secrecy::SecretString;
use serde_json::Value as Json;
use tokio::sync::Mutex;

use super::auth;
use super::builder::SessionBuilder;
use super::events::{
    CredentialsChanged, DivisionChanged, EventDispatcher, Propagation, RateLimitReached,
    RateLimitsUpdated, TokenCause,
};
use super::state::{AuthState, SessionStatus};
use crate::api::constants::{CURRENT_DIVISION_FIELD, ME_ENTITY};
use crate::api::errors::{Error, Result, ValidationError};
use crate::api::hydration::{Entity, Hydrator, Value};
use crate::api::metadata::{EntityMetadata, MetadataRegistry};
use crate::api::models::{CredentialProvider, TokenSet};
use crate::api::operations::Operation;
use crate::api::query::result::{unwrap_collection, unwrap_single};
use crate::api::query::{Page, QueryBuilder};
use crate::api::resilience::RateLimits;
use crate::api::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::config::SessionConfig;

pub(crate) struct Inner {
    pub config: SessionConfig,
    pub credentials: Arc<dyn CredentialProvider>,
    pub transport: Arc<dyn Transport>,
    pub registry: Arc<MetadataRegistry>,
    pub events: EventDispatcher,
    pub auth: Mutex<AuthState>,
    pub division: Mutex<Option<i64>>,
    /// Serializes division changes; `division` is never held across an await
    pub division_switch: Mutex<()>,
    pub rate_limits: Mutex<RateLimits>,
}

/// One credential/administration pair
///
/// Cheap to clone; clones share tokens, division and rate limits. Token
/// refresh, division resolution and rate-limit updates each run under their
/// own lock, so concurrent callers never refresh twice.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

/// A decode failure on a successful response is a response error
fn unusable(err: Error, request: &ApiRequest, response: &ApiResponse) -> Error {
    match err {
        Error::Decode(message) => Error::Response {
            message,
            request: Box::new(request.clone()),
            response: Box::new(response.clone()),
        },
        other => other,
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.inner.registry
    }

    pub fn hydrator(&self) -> Hydrator<'_> {
        Hydrator::new(&self.inner.registry)
    }

    pub fn metadata(&self, tag: &str) -> Result<Arc<EntityMetadata>> {
        self.inner.registry.metadata(tag)
    }

    /// A fresh entity of `tag`, all fields null
    pub fn entity(&self, tag: &str) -> Result<Entity> {
        Ok(Entity::new(self.metadata(tag)?))
    }

    fn is_configured(&self) -> bool {
        !self.inner.credentials.client_id().is_empty()
            && !self.inner.credentials.redirect_uri().is_empty()
    }

    /// Where a human authorizes this app
    pub fn authorization_url(&self) -> String {
        auth::authorization_url(&self.inner.config.base_url, self.inner.credentials.as_ref())
    }

    fn credentials_needed(&self) -> Error {
        Error::CredentialsNeeded {
            authorization_url: self.authorization_url(),
        }
    }

    /// Hand over the code returned to the redirect URI
    pub async fn set_authorization_code(&self, code: impl Into<String>) {
        let mut auth = self.inner.auth.lock().await;
        auth.authorization_code = Some(SecretString::from(code.into()));
        debug!("Authorization code received");
    }

    pub async fn status(&self) -> SessionStatus {
        let auth = self.inner.auth.lock().await;
        auth.status(
            self.is_configured(),
            Utc::now(),
            self.inner.config.token_expiry_margin(),
        )
    }

    pub async fn tokens(&self) -> Option<TokenSet> {
        self.inner.auth.lock().await.tokens.clone()
    }

    pub async fn rate_limits(&self) -> RateLimits {
        *self.inner.rate_limits.lock().await
    }

    /// Obtain tokens now instead of on the first request
    pub async fn connect(&self) -> Result<()> {
        self.access_token().await.map(drop)
    }

    /// A valid access token, exchanging or refreshing as needed
    ///
    /// The auth lock is held for the whole exchange, so callers arriving
    /// mid-refresh wait and then reuse the new token.
    async fn access_token(&self) -> Result<SecretString> {
        let margin = self.inner.config.token_expiry_margin();
        let mut auth = self.inner.auth.lock().await;
        if let Some(tokens) = auth.valid_tokens(Utc::now(), margin) {
            return Ok(tokens.access_token.clone());
        }
        if !self.is_configured() {
            return Err(Error::Config(
                "client id and redirect URI are required".into(),
            ));
        }

        let base_url = &self.inner.config.base_url;
        let credentials = self.inner.credentials.as_ref();
        let refresh_token = auth.tokens.as_ref().and_then(|t| t.refresh_token.clone());

        let (request, cause) = if let Some(refresh) = &refresh_token {
            debug!("Access token expired, refreshing");
            (
                auth::refresh_request(base_url, credentials, refresh),
                TokenCause::Refreshed,
            )
        } else if let Some(code) = &auth.authorization_code {
            debug!("Exchanging authorization code");
            (
                auth::exchange_request(base_url, credentials, code),
                TokenCause::Exchanged,
            )
        } else {
            auth.tokens = None;
            warn!("No refresh token or authorization code, authorization required");
            return Err(self.credentials_needed());
        };

        let response = self
            .inner
            .transport
            .send(request.clone())
            .await
            .map_err(|source| Error::Communication {
                url: request.url.clone(),
                source,
            })?;

        // The server has seen the code; it cannot be used again
        if cause == TokenCause::Exchanged {
            auth.authorization_code = None;
        }

        if !response.is_success() {
            if (400..500).contains(&response.status) {
                warn!(
                    "Token request ({:?}) rejected with {}, authorization required",
                    cause, response.status
                );
                auth.tokens = None;
                return Err(self.credentials_needed());
            }
            return Err(Error::ResponseNotOk {
                status: response.status,
                reason: response.reason.clone(),
                request: Box::new(request),
                response: Box::new(auth::redacted(&response)),
            });
        }

        let mut tokens = auth::parse_tokens(&request, &response, Utc::now())?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = refresh_token;
        }
        info!(
            "Access token {:?}, valid until {}",
            cause, tokens.expires_at
        );

        self.inner
            .events
            .credentials_changed(&CredentialsChanged {
                tokens: tokens.clone(),
                cause,
            })
            .await;

        let access_token = tokens.access_token.clone();
        auth.tokens = Some(tokens);
        Ok(access_token)
    }

    /// The division used for requests, resolved through `Me` on first use
    pub async fn division(&self) -> Result<i64> {
        if let Some(current) = self.current_division().await {
            return Ok(current);
        }

        let _switch = self.inner.division_switch.lock().await;
        if let Some(current) = self.current_division().await {
            return Ok(current);
        }

        debug!("Resolving current division");
        let me = self
            .fetch_me(QueryBuilder::new().select(&[CURRENT_DIVISION_FIELD]))
            .await?;
        let current = me.get(CURRENT_DIVISION_FIELD).as_int().ok_or_else(|| {
            Error::Decode(format!("{} did not report {}", ME_ENTITY, CURRENT_DIVISION_FIELD))
        })?;

        self.inner
            .events
            .division_changed(&DivisionChanged {
                previous: None,
                current,
            })
            .await;
        info!("Using division {}", current);
        *self.inner.division.lock().await = Some(current);
        Ok(current)
    }

    /// The division in effect, without resolving it
    pub async fn current_division(&self) -> Option<i64> {
        *self.inner.division.lock().await
    }

    /// Switch administrations; observers hear about it before it takes effect
    pub async fn set_division(&self, current: i64) {
        let _switch = self.inner.division_switch.lock().await;
        let previous = self.current_division().await;
        if previous == Some(current) {
            return;
        }
        let event = DivisionChanged { previous, current };
        self.inner.events.division_changed(&event).await;
        info!("Switching division {:?} -> {}", previous, current);
        *self.inner.division.lock().await = Some(current);
    }

    async fn check_rate_limits(&self, request: &ApiRequest) -> Result<()> {
        let limits = *self.inner.rate_limits.lock().await;
        if !limits.is_limited_at(Utc::now()) {
            return Ok(());
        }

        let event = RateLimitReached {
            limits,
            method: request.method,
            url: request.url.clone(),
        };
        match self.inner.events.rate_limit_reached(&event).await {
            Propagation::Handled => {
                warn!("Rate limit reached, proceeding as an observer handled it");
                Ok(())
            }
            _ => {
                warn!("Rate limit reached, rejecting {} {}", request.method, request.url);
                Err(Error::RateLimitReached { limits })
            }
        }
    }

    async fn record_rate_limits(&self, response: &ApiResponse) {
        let mut limits = self.inner.rate_limits.lock().await;
        if limits.update_from_headers(response) {
            self.inner
                .events
                .rate_limits_updated(&RateLimitsUpdated { limits: *limits })
                .await;
        }
    }

    /// Send an authorized request and require a success status
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.check_rate_limits(&request).await?;
        let token = self.access_token().await?;

        let mut request = request
            .bearer(token)
            .header("Accept", "application/json");
        if let Some(agent) = &self.inner.config.user_agent {
            request = request.header("User-Agent", agent.clone());
        }

        debug!("{} {}", request.method, request.url);
        let response = self
            .inner
            .transport
            .send(request.clone())
            .await
            .map_err(|source| Error::Communication {
                url: request.url.clone(),
                source,
            })?;
        self.record_rate_limits(&response).await;

        if !response.is_success() {
            debug!("{} {} returned {}", request.method, request.url, response.status);
            return Err(Error::ResponseNotOk {
                status: response.status,
                reason: response.reason.clone(),
                request: Box::new(request),
                response: Box::new(response),
            });
        }
        Ok(response)
    }

    fn page_size(&self, metadata: &EntityMetadata) -> u32 {
        self.inner.config.page_size.unwrap_or(metadata.page_size())
    }

    async fn endpoint_url(&self, metadata: &EntityMetadata) -> Result<String> {
        let division = if metadata.requires_division() {
            Some(Box::pin(self.division()).await?)
        } else {
            None
        };
        Ok(format!(
            "{}{}",
            self.inner.config.base_url,
            metadata.endpoint_for(division)?
        ))
    }

    /// `Endpoint(<key literal>)`
    async fn key_url(&self, metadata: &EntityMetadata, key: &Value) -> Result<String> {
        let field = metadata.key_field().ok_or_else(|| Error::Schema {
            entity: metadata.tag().to_string(),
            reason: "no key field declared".into(),
        })?;
        if key.is_null() {
            return Err(ValidationError::new(field.name(), "key value is required").into());
        }
        let literal = field
            .edm_type()
            .encode_for_filter(key)
            .map_err(|e| e.for_field(field.name()))?;
        let endpoint = self.endpoint_url(metadata).await?;
        Ok(format!(
            "{}({})",
            endpoint,
            urlencoding::encode(&literal.to_string())
        ))
    }

    fn with_query(url: String, query: &crate::api::query::Query) -> String {
        if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query.to_query_string())
        }
    }

    async fn fetch_me(&self, query: QueryBuilder) -> Result<Entity> {
        let metadata = self.metadata(ME_ENTITY)?;
        let query = query.build(&metadata)?;
        let url = Self::with_query(self.endpoint_url(&metadata).await?, &query);

        let request = ApiRequest::new(Method::Get, url);
        let response = self.send(request.clone()).await?;
        let record = unwrap_single(&response.body)
            .map_err(|e| unusable(e, &request, &response))?
            .ok_or_else(|| {
                unusable(
                    Error::Decode("identity lookup returned no record".into()),
                    &request,
                    &response,
                )
            })?;
        self.hydrator().hydrate(&metadata, record, None)
    }

    /// The authenticated user
    pub async fn me(&self) -> Result<Entity> {
        self.fetch_me(QueryBuilder::new()).await
    }

    /// Fetch one record by key; `None` when the service reports 404
    pub async fn find(&self, tag: &str, key: impl Into<Value>) -> Result<Option<Entity>> {
        let metadata = self.metadata(tag)?;
        metadata.ensure_supports(Operation::Read)?;
        let url = self.key_url(&metadata, &key.into()).await?;

        let request = ApiRequest::new(Method::Get, url);
        let response = match self.send(request.clone()).await {
            Ok(response) => response,
            Err(e) if e.status() == Some(404) => return Ok(None),
            Err(e) => return Err(e),
        };
        let record =
            unwrap_single(&response.body).map_err(|e| unusable(e, &request, &response))?;
        record
            .map(|json| self.hydrator().hydrate(&metadata, json, None))
            .transpose()
    }

    /// First page of a query; `$top` defaults to the entity's page size
    pub async fn list(&self, tag: &str, query: QueryBuilder) -> Result<Page> {
        let metadata = self.metadata(tag)?;
        metadata.ensure_supports(Operation::Read)?;
        let query = query
            .build(&metadata)?
            .with_default_top(self.page_size(&metadata));
        let url = Self::with_query(self.endpoint_url(&metadata).await?, &query);
        self.fetch_page(&metadata, url).await
    }

    /// Follow a page's next link
    pub async fn next_page(&self, tag: &str, page: &Page) -> Result<Option<Page>> {
        let Some(next) = &page.next else {
            return Ok(None);
        };
        let metadata = self.metadata(tag)?;
        self.fetch_page(&metadata, next.clone()).await.map(Some)
    }

    /// Every record matching `query`, following next links until exhausted
    pub async fn list_all(&self, tag: &str, query: QueryBuilder) -> Result<Vec<Entity>> {
        let metadata = self.metadata(tag)?;
        metadata.ensure_supports(Operation::Read)?;
        let query = query.build(&metadata)?;

        let mut items = Vec::new();
        let mut next = Some(Self::with_query(self.endpoint_url(&metadata).await?, &query));
        while let Some(url) = next.take() {
            let page = self.fetch_page(&metadata, url).await?;
            next = page.next;
            items.extend(page.items);
        }

        debug!("Fetched {} {} records", items.len(), metadata.tag());
        Ok(items)
    }

    async fn fetch_page(&self, metadata: &Arc<EntityMetadata>, url: String) -> Result<Page> {
        let request = ApiRequest::new(Method::Get, url);
        let response = self.send(request.clone()).await?;
        let (records, next) =
            unwrap_collection(&response.body).map_err(|e| unusable(e, &request, &response))?;

        let hydrator = self.hydrator();
        let items = records
            .into_iter()
            .map(|record| hydrator.hydrate(metadata, record, None))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page { items, next })
    }

    /// POST a new record; returns it merged with what the service assigned
    pub async fn create(&self, entity: &Entity) -> Result<Entity> {
        let metadata = Arc::clone(entity.metadata());
        metadata.ensure_supports(Operation::Create)?;

        let hydrator = self.hydrator();
        hydrator.check_required(entity, Operation::Create)?;
        let body = hydrator.deflate(entity, Some(Operation::Create), true)?;

        let url = self.endpoint_url(&metadata).await?;
        let request =
            ApiRequest::new(Operation::Create.http_method(), url).json(Json::Object(body));
        let response = self.send(request.clone()).await?;
        if response.body.trim().is_empty() {
            return Ok(entity.clone());
        }

        match unwrap_single(&response.body).map_err(|e| unusable(e, &request, &response))? {
            Some(record) => hydrator.hydrate(&metadata, record, Some(entity.clone())),
            None => Ok(entity.clone()),
        }
    }

    /// PUT the update-visible, non-null fields of a record
    pub async fn update(&self, entity: &Entity) -> Result<()> {
        let metadata = entity.metadata();
        metadata.ensure_supports(Operation::Update)?;

        let key = entity.key().cloned().unwrap_or_default();
        let url = self.key_url(metadata, &key).await?;
        let body = self
            .hydrator()
            .deflate(entity, Some(Operation::Update), true)?;

        let request =
            ApiRequest::new(Operation::Update.http_method(), url).json(Json::Object(body));
        self.send(request).await.map(drop)
    }

    pub async fn delete(&self, entity: &Entity) -> Result<()> {
        let metadata = entity.metadata();
        metadata.ensure_supports(Operation::Delete)?;

        let key = entity.key().cloned().unwrap_or_default();
        let url = self.key_url(metadata, &key).await?;
        self.send(ApiRequest::new(Operation::Delete.http_method(), url))
            .await
            .map(drop)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.inner.config.base_url)
            .field("client_id", &self.inner.credentials.client_id())
            .field("events", &self.inner.events)
            .finish_non_exhaustive()
    }
}
