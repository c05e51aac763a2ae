//! Authorization state machine

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;

use crate::api::models::TokenSet;

/// Where a session stands in the OAuth flow
///
/// Rate limiting is checked per request and is not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Credentials lack a client id or redirect URI
    Unconfigured,
    /// A human must authorize the app via the authorization URL
    AwaitingAuthorization,
    /// An authorization code is waiting to be exchanged
    AwaitingAccessToken,
    Ready,
    /// The access token expired; the next request refreshes it
    Expired,
}

#[derive(Debug, Default)]
pub(crate) struct AuthState {
    pub tokens: Option<TokenSet>,
    /// Single use; taken when exchanged
    pub authorization_code: Option<SecretString>,
}

impl AuthState {
    pub fn status(&self, configured: bool, now: DateTime<Utc>, margin: Duration) -> SessionStatus {
        if !configured {
            return SessionStatus::Unconfigured;
        }
        match (&self.tokens, &self.authorization_code) {
            (Some(tokens), _) if !tokens.is_expired_at(now, margin) => SessionStatus::Ready,
            (Some(tokens), _) if tokens.has_refresh_token() => SessionStatus::Expired,
            (_, Some(_)) => SessionStatus::AwaitingAccessToken,
            _ => SessionStatus::AwaitingAuthorization,
        }
    }

    /// Usable access token at `now`
    pub fn valid_tokens(&self, now: DateTime<Utc>, margin: Duration) -> Option<&TokenSet> {
        self.tokens
            .as_ref()
            .filter(|tokens| !tokens.is_expired_at(now, margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let now = Utc::now();
        let margin = Duration::seconds(30);
        let mut state = AuthState::default();

        assert_eq!(state.status(false, now, margin), SessionStatus::Unconfigured);
        assert_eq!(state.status(true, now, margin), SessionStatus::AwaitingAuthorization);

        state.authorization_code = Some(SecretString::from("code".to_string()));
        assert_eq!(state.status(true, now, margin), SessionStatus::AwaitingAccessToken);

        state.authorization_code = None;
        state.tokens = Some(TokenSet::new("a", Some("r".into()), now + Duration::minutes(10)));
        assert_eq!(state.status(true, now, margin), SessionStatus::Ready);
        assert!(state.valid_tokens(now, margin).is_some());

        let later = now + Duration::minutes(10);
        assert_eq!(state.status(true, later, margin), SessionStatus::Expired);
        assert!(state.valid_tokens(later, margin).is_none());

        // Expired without a refresh token needs a new authorization
        state.tokens = Some(TokenSet::new("a", None, now));
        assert_eq!(state.status(true, later, margin), SessionStatus::AwaitingAuthorization);
    }
}
