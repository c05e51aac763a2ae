//! OAuth2 requests against the regional token endpoint

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::api::constants::{AUTHORIZE_PATH, TOKEN_PATH};
use crate::api::errors::{Error, Result};
use crate::api::models::{CredentialProvider, TokenResponse, TokenSet};
use crate::api::transport::{ApiRequest, ApiResponse, Method};

fn public(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

/// URL a human opens to grant the app access
pub(crate) fn authorization_url(base_url: &str, credentials: &dyn CredentialProvider) -> String {
    format!(
        "{}{}?client_id={}&redirect_uri={}&response_type=code",
        base_url,
        AUTHORIZE_PATH,
        urlencoding::encode(credentials.client_id()),
        urlencoding::encode(credentials.redirect_uri()),
    )
}

fn token_request(base_url: &str, fields: Vec<(String, SecretString)>) -> ApiRequest {
    ApiRequest::new(Method::Post, format!("{}{}", base_url, TOKEN_PATH))
        .header("Accept", "application/json")
        .form(fields)
}

pub(crate) fn exchange_request(
    base_url: &str,
    credentials: &dyn CredentialProvider,
    code: &SecretString,
) -> ApiRequest {
    token_request(
        base_url,
        vec![
            ("grant_type".into(), public("authorization_code")),
            ("code".into(), code.clone()),
            ("redirect_uri".into(), public(credentials.redirect_uri())),
            ("client_id".into(), public(credentials.client_id())),
            ("client_secret".into(), credentials.client_secret().clone()),
        ],
    )
}

pub(crate) fn refresh_request(
    base_url: &str,
    credentials: &dyn CredentialProvider,
    refresh_token: &SecretString,
) -> ApiRequest {
    token_request(
        base_url,
        vec![
            ("grant_type".into(), public("refresh_token")),
            ("refresh_token".into(), refresh_token.clone()),
            ("client_id".into(), public(credentials.client_id())),
            ("client_secret".into(), credentials.client_secret().clone()),
        ],
    )
}

/// Token set from a successful token response
pub(crate) fn parse_tokens(
    request: &ApiRequest,
    response: &ApiResponse,
    issued_at: DateTime<Utc>,
) -> Result<TokenSet> {
    let parsed: TokenResponse =
        serde_json::from_str(&response.body).map_err(|e| Error::Response {
            message: format!("malformed token response: {}", e),
            request: Box::new(request.clone()),
            response: Box::new(redacted(response)),
        })?;
    if parsed.access_token.is_empty() {
        return Err(Error::Response {
            message: "token response carries no access token".into(),
            request: Box::new(request.clone()),
            response: Box::new(redacted(response)),
        });
    }
    parsed.into_token_set(issued_at).ok_or_else(|| Error::Response {
        message: "token lifetime out of range".into(),
        request: Box::new(request.clone()),
        response: Box::new(redacted(response)),
    })
}

/// Token responses must not travel inside errors with their body intact
pub(crate) fn redacted(response: &ApiResponse) -> ApiResponse {
    ApiResponse {
        body: "[REDACTED]".into(),
        ..response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Credentials;
    use crate::api::transport::RequestBody;
    use secrecy::ExposeSecret;

    fn credentials() -> Credentials {
        Credentials::new("my-client", "s3cret", "https://app.example/callback?x=1")
    }

    #[test]
    fn test_authorization_url() {
        let url = authorization_url("https://start.exactonline.nl", &credentials());
        assert_eq!(
            url,
            "https://start.exactonline.nl/api/oauth2/auth?client_id=my-client\
             &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback%3Fx%3D1&response_type=code"
        );
    }

    #[test]
    fn test_token_requests() {
        let credentials = credentials();
        let code = SecretString::from("the-code".to_string());
        let request = exchange_request("https://start.exactonline.be", &credentials, &code);
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://start.exactonline.be/api/oauth2/token");

        let RequestBody::Form(fields) = &request.body else {
            panic!("token requests are form encoded");
        };
        let get = |name: &str| {
            fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.expose_secret().to_string())
        };
        assert_eq!(get("grant_type").as_deref(), Some("authorization_code"));
        assert_eq!(get("code").as_deref(), Some("the-code"));
        assert_eq!(get("client_secret").as_deref(), Some("s3cret"));

        // Secrets stay out of debug output
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("the-code"));

        let refresh = SecretString::from("rt".to_string());
        let request = refresh_request("https://start.exactonline.be", &credentials, &refresh);
        let RequestBody::Form(fields) = &request.body else {
            panic!("token requests are form encoded");
        };
        assert!(fields.iter().any(|(n, v)| n == "refresh_token" && v.expose_secret() == "rt"));
    }

    #[test]
    fn test_parse_tokens() {
        let request = ApiRequest::new(Method::Post, "https://start.exactonline.nl/api/oauth2/token");
        let now = Utc::now();

        let ok = ApiResponse::new(
            200,
            r#"{"access_token":"a","refresh_token":"r","expires_in":"600","token_type":"bearer"}"#,
        );
        let tokens = parse_tokens(&request, &ok, now).unwrap();
        assert_eq!(tokens.expires_at, now + chrono::Duration::seconds(600));

        let bad = ApiResponse::new(200, r#"{"access_token":"a"}"#);
        match parse_tokens(&request, &bad, now).unwrap_err() {
            Error::Response { response, .. } => assert_eq!(response.body, "[REDACTED]"),
            other => panic!("unexpected error: {}", other),
        }

        let empty = ApiResponse::new(200, r#"{"access_token":"","expires_in":600}"#);
        assert!(parse_tokens(&request, &empty, now).is_err());

        let endless = ApiResponse::new(
            200,
            r#"{"access_token":"a","refresh_token":"r","expires_in":"9223372036854775807"}"#,
        );
        match parse_tokens(&request, &endless, now).unwrap_err() {
            Error::Response { message, response, .. } => {
                assert!(message.contains("out of range"));
                assert_eq!(response.body, "[REDACTED]");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
