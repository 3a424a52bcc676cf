//! Common types for the client-credentials flow

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Minimum remaining lifetime for a cached token to be handed out
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Upper bound applied to advertised token lifetimes
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// OAuth2 client registration used for outbound calls
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientRegistration {
    /// Token endpoint of the identity provider
    pub token_uri: String,
    /// Client ID
    pub client_id: String,
    /// Client secret (sent with HTTP Basic auth)
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Requested scope
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("scope", &self.scope)
            .finish()
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Token type (usually "Bearer")
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token expiration in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Granted scope
    #[serde(default)]
    pub scope: Option<String>,
}

/// Bearer credential for one client registration
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: Option<Instant>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Build from a token endpoint response received at `issued_at`.
    ///
    /// Lifetimes longer than [`MAX_TOKEN_LIFETIME`] are clamped to it.
    pub fn from_response(response: TokenResponse, issued_at: Instant) -> Self {
        let expires_at = response.expires_in.and_then(|secs| {
            let lifetime = Duration::from_secs(secs).min(MAX_TOKEN_LIFETIME);
            issued_at.checked_add(lifetime)
        });

        Self {
            value: response.access_token,
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// True if the token stays valid for at least `skew` after `now`.
    ///
    /// Tokens without expiry information are never considered reusable.
    pub fn is_fresh(&self, now: Instant, skew: Duration) -> bool {
        match (self.expires_at, now.checked_add(skew)) {
            (Some(expires_at), Some(threshold)) => expires_at > threshold,
            _ => false,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_freshness() {
        let now = Instant::now();
        let token = AccessToken::new("abc", Some(now + Duration::from_secs(300)));

        assert!(token.is_fresh(now, DEFAULT_EXPIRY_SKEW));
        assert!(!token.is_fresh(now + Duration::from_secs(250), DEFAULT_EXPIRY_SKEW));
    }

    #[test]
    fn test_token_without_expiry_is_not_reusable() {
        let token = AccessToken::new("abc", None);
        assert!(!token.is_fresh(Instant::now(), Duration::ZERO));
    }

    #[test]
    fn test_from_response() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"tok","token_type":"Bearer","expires_in":120}"#,
        )
        .unwrap();
        let issued_at = Instant::now();
        let token = AccessToken::from_response(response, issued_at);

        assert_eq!(token.secret(), "tok");
        assert_eq!(token.expires_at(), Some(issued_at + Duration::from_secs(120)));
    }

    #[test]
    fn test_huge_lifetime_is_clamped() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"tok","expires_in":18446744073709551615}"#,
        )
        .unwrap();
        let issued_at = Instant::now();
        let token = AccessToken::from_response(response, issued_at);

        assert_eq!(token.expires_at(), Some(issued_at + MAX_TOKEN_LIFETIME));
        assert!(token.is_fresh(issued_at, DEFAULT_EXPIRY_SKEW));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let token = AccessToken::new("super-secret", None);
        assert!(!format!("{:?}", token).contains("super-secret"));

        let registration = ClientRegistration {
            token_uri: "https://idp.example.com/token".to_string(),
            client_id: "conductor".to_string(),
            client_secret: Some("hunter2".to_string()),
            scope: None,
        };
        assert!(!format!("{:?}", registration).contains("hunter2"));
    }
}
