//! Client-credentials token provider for outbound calls

use base64::Engine;
use reqwest::Client;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing;

use super::types::{AccessToken, ClientRegistration, TokenResponse, DEFAULT_EXPIRY_SKEW};
use crate::error::{GuardError, Result};

struct RegistrationEntry {
    registration: ClientRegistration,
    /// Held across the token exchange so concurrent callers share one refresh
    cached: Mutex<Option<AccessToken>>,
    /// Bumped after every successful exchange, under the `cached` lock
    generation: AtomicU64,
}

/// Obtains and caches access tokens per client registration.
///
/// At most one exchange per registration is in flight; callers arriving
/// during a refresh wait for it and receive the same token. Registrations
/// refresh independently of each other.
#[derive(Clone)]
pub struct ClientCredentialsProvider {
    http_client: Client,
    entries: Arc<HashMap<String, RegistrationEntry>>,
    expiry_skew: Duration,
}

impl ClientCredentialsProvider {
    /// Create a provider for a fixed set of registrations
    pub fn new(registrations: HashMap<String, ClientRegistration>) -> Self {
        Self::with_client(Client::new(), registrations)
    }

    pub fn with_client(
        http_client: Client,
        registrations: HashMap<String, ClientRegistration>,
    ) -> Self {
        let entries = registrations
            .into_iter()
            .map(|(id, registration)| {
                (
                    id,
                    RegistrationEntry {
                        registration,
                        cached: Mutex::new(None),
                        generation: AtomicU64::new(0),
                    },
                )
            })
            .collect();

        Self {
            http_client,
            entries: Arc::new(entries),
            expiry_skew: DEFAULT_EXPIRY_SKEW,
        }
    }

    /// Override how long before expiry a cached token is refreshed
    pub fn with_expiry_skew(mut self, skew: Duration) -> Self {
        self.expiry_skew = skew;
        self
    }

    pub fn has_registration(&self, registration_id: &str) -> bool {
        self.entries.contains_key(registration_id)
    }

    /// Return a valid token for `registration_id`, exchanging if needed.
    ///
    /// A caller that waited on an exchange started by someone else gets that
    /// exchange's token, even when its lifetime is too short to be cached.
    pub async fn get_token(&self, registration_id: &str) -> Result<AccessToken> {
        let entry = self.entry(registration_id)?;
        let seen = entry.generation.load(Ordering::Acquire);

        let mut cached = entry.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            let refreshed_while_waiting = entry.generation.load(Ordering::Acquire) != seen;
            if refreshed_while_waiting || token.is_fresh(Instant::now(), self.expiry_skew) {
                return Ok(token.clone());
            }
        }

        let token = self.exchange(registration_id, &entry.registration).await?;
        *cached = Some(token.clone());
        entry.generation.fetch_add(1, Ordering::Release);
        Ok(token)
    }

    /// Drop the cached token so the next call performs a fresh exchange
    pub async fn invalidate(&self, registration_id: &str) -> Result<()> {
        let entry = self.entry(registration_id)?;
        *entry.cached.lock().await = None;
        tracing::debug!("Invalidated cached token for client registration '{}'", registration_id);
        Ok(())
    }

    /// Drop the cached token only if it is still `rejected`.
    ///
    /// Returns whether the cache was cleared; a token refreshed in the
    /// meantime is kept.
    pub async fn invalidate_token(
        &self,
        registration_id: &str,
        rejected: &AccessToken,
    ) -> Result<bool> {
        let entry = self.entry(registration_id)?;
        let mut cached = entry.cached.lock().await;
        if cached
            .as_ref()
            .is_some_and(|token| token.secret() == rejected.secret())
        {
            *cached = None;
            tracing::debug!("Invalidated rejected token for client registration '{}'", registration_id);
            return Ok(true);
        }
        Ok(false)
    }

    fn entry(&self, registration_id: &str) -> Result<&RegistrationEntry> {
        self.entries.get(registration_id).ok_or_else(|| {
            GuardError::Config(format!("Unknown client registration '{}'", registration_id))
        })
    }

    async fn exchange(
        &self,
        registration_id: &str,
        registration: &ClientRegistration,
    ) -> Result<AccessToken> {
        let failure = |message: String| GuardError::TokenAcquisition {
            registration: registration_id.to_string(),
            message,
        };

        tracing::debug!(
            "Requesting client-credentials token for '{}' from: {}",
            registration_id,
            registration.token_uri
        );

        let mut params = vec![("grant_type", "client_credentials".to_string())];
        if let Some(scope) = &registration.scope {
            params.push(("scope", scope.clone()));
        }

        let mut request = self
            .http_client
            .post(&registration.token_uri)
            .header("Accept", "application/json");

        // Add basic auth if client secret is provided
        if let Some(secret) = &registration.client_secret {
            use base64::engine::general_purpose::STANDARD;
            let credentials = STANDARD.encode(format!("{}:{}", registration.client_id, secret));
            request = request.header("Authorization", format!("Basic {}", credentials));
        } else {
            // For public clients, include client_id in body
            params.push(("client_id", registration.client_id.clone()));
        }

        let issued_at = Instant::now();
        let response = request
            .form(&params)
            .send()
            .await
            .map_err(|e| failure(format!("Token endpoint unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Client-credentials exchange for '{}' rejected with status {}",
                registration_id,
                status
            );
            return Err(failure(format!("Token endpoint returned {}: {}", status, error_text)));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| failure(format!("Failed to parse token response: {}", e)))?;

        if let Some(token_type) = &token_response.token_type {
            if !token_type.eq_ignore_ascii_case("bearer") {
                return Err(failure(format!("Unsupported token type: {}", token_type)));
            }
        }

        tracing::info!(
            "Obtained access token for client registration '{}' (expires_in={:?})",
            registration_id,
            token_response.expires_in
        );

        Ok(AccessToken::from_response(token_response, issued_at))
    }
}
