//! Application credentials and OAuth token sets

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::Deserialize;

/// Source of the registered application's credentials
///
/// The session only reads credentials through this trait, so they can live
/// in a vault or key store instead of a plain struct.
pub trait CredentialProvider: Send + Sync {
    fn client_id(&self) -> &str;
    fn client_secret(&self) -> &SecretString;
    fn redirect_uri(&self) -> &str;
    /// Secret used to verify webhook payloads, when webhooks are in use
    fn webhook_secret(&self) -> Option<&SecretString> {
        None
    }
}

/// Plain credential holder for a registered app
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub webhook_secret: Option<SecretString>,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            redirect_uri: redirect_uri.into(),
            webhook_secret: None,
        }
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Load from `EXACT_*` environment variables, reading `.env` first
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let client_id = std::env::var("EXACT_CLIENT_ID").context("EXACT_CLIENT_ID is not set")?;
        let client_secret =
            std::env::var("EXACT_CLIENT_SECRET").context("EXACT_CLIENT_SECRET is not set")?;
        let redirect_uri =
            std::env::var("EXACT_REDIRECT_URI").context("EXACT_REDIRECT_URI is not set")?;

        let credentials = Self::new(client_id, client_secret, redirect_uri);
        Ok(match std::env::var("EXACT_WEBHOOK_SECRET") {
            Ok(secret) if !secret.is_empty() => credentials.with_webhook_secret(secret),
            _ => credentials,
        })
    }
}

impl CredentialProvider for Credentials {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    fn webhook_secret(&self) -> Option<&SecretString> {
        self.webhook_secret.as_ref()
    }
}

/// Access and refresh tokens with the access token's expiry instant
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: refresh_token.map(SecretString::from),
            expires_at,
        }
    }

    /// Whether the access token is unusable at `now`, counting `margin` early
    pub fn is_expired_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now.checked_add_signed(margin)
            .map_or(true, |deadline| deadline >= self.expires_at)
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Body of the token endpoint's response
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(deserialize_with = "seconds_from_string_or_number")]
    pub expires_in: i64,
}

impl TokenResponse {
    /// `None` when `expires_in` does not fit a timestamp
    pub fn into_token_set(self, issued_at: DateTime<Utc>) -> Option<TokenSet> {
        let expires_at = Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))?;
        Some(TokenSet::new(
            self.access_token,
            self.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
        ))
    }
}

/// The token endpoint reports `expires_in` as a quoted number
fn seconds_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(i64),
        Text(String),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Number(n) => Ok(n),
        Seconds::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_token_response_parsing() {
        let issued_at = Utc::now();
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"AAA","token_type":"bearer","expires_in":"600","refresh_token":"RRR"}"#,
        )
        .unwrap();
        let tokens = response.into_token_set(issued_at).unwrap();
        assert_eq!(tokens.access_token.expose_secret(), "AAA");
        assert_eq!(tokens.refresh_token.as_ref().unwrap().expose_secret(), "RRR");
        assert_eq!(tokens.expires_at, issued_at + Duration::seconds(600));

        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"AAA","expires_in":600}"#).unwrap();
        assert!(!response.into_token_set(issued_at).unwrap().has_refresh_token());
    }

    #[test]
    fn test_token_lifetime_out_of_range() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"AAA","expires_in":"9223372036854775807"}"#,
        )
        .unwrap();
        assert!(response.into_token_set(Utc::now()).is_none());

        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"AAA","expires_in":9000000000000000}"#).unwrap();
        assert!(response.into_token_set(Utc::now()).is_none());
    }

    #[test]
    fn test_token_expiry_with_margin() {
        let now = Utc::now();
        let tokens = TokenSet::new("a", None, now + Duration::seconds(30));
        assert!(!tokens.is_expired_at(now, Duration::zero()));
        assert!(tokens.is_expired_at(now, Duration::seconds(30)));
        assert!(tokens.is_expired_at(now + Duration::seconds(31), Duration::zero()));
        // A margin past the end of time counts as expired
        assert!(tokens.is_expired_at(now, Duration::MAX));
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let credentials = Credentials::new("client", "very-secret", "https://app.example/callback")
            .with_webhook_secret("hook-secret");
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("client"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("hook-secret"));
        assert_eq!(credentials.client_secret().expose_secret(), "very-secret");
    }
}
