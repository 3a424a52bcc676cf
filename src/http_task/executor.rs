//! Outbound HTTP call execution for workflow tasks

use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::StatusCode;
use reqwest::Client;
use serde_json::Value;
use tracing;

use super::request::RequestDescription;
use super::response::{NormalizedResponse, RemoteHttpError};
use crate::error::{GuardError, Result};
use crate::oidc::client::ClientCredentialsProvider;
use crate::oidc::types::AccessToken;

/// Default limit for buffered response bodies (2 MiB)
pub const DEFAULT_MAX_IN_MEMORY_SIZE: usize = 2 * 1024 * 1024;

#[derive(Clone)]
struct OutboundAuth {
    provider: ClientCredentialsProvider,
    registration_id: String,
}

/// Executes outbound HTTP calls on behalf of workflow tasks.
///
/// Stateless across calls apart from the shared token provider. Dropping the
/// future returned by [`execute`](Self::execute) aborts the underlying
/// request and releases its connection.
#[derive(Clone)]
pub struct HttpTaskExecutor {
    http_client: Client,
    auth: Option<OutboundAuth>,
    max_in_memory_size: usize,
}

impl HttpTaskExecutor {
    /// Create an executor issuing unauthenticated calls
    pub fn new(max_in_memory_size: usize) -> Self {
        Self {
            http_client: Client::new(),
            auth: None,
            max_in_memory_size,
        }
    }

    pub fn with_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Attach a bearer token from `provider` to every call
    pub fn with_token_provider(
        mut self,
        provider: ClientCredentialsProvider,
        registration_id: impl Into<String>,
    ) -> Self {
        self.auth = Some(OutboundAuth {
            provider,
            registration_id: registration_id.into(),
        });
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Perform the call described by `request`.
    ///
    /// 4xx/5xx answers are returned as a [`NormalizedResponse`] carrying the
    /// remote status and message. Connection failures and timeouts fail with
    /// [`GuardError::Transport`]; token failures with
    /// [`GuardError::TokenAcquisition`].
    pub async fn execute(&self, request: RequestDescription) -> Result<NormalizedResponse> {
        let token = match &self.auth {
            Some(auth) => Some(auth.provider.get_token(&auth.registration_id).await?),
            None => None,
        };

        let builder = self.build_request(&request, token.as_ref())?;

        tracing::debug!("Executing HTTP task: {} {}", request.method, request.uri);

        let response = builder.send().await.map_err(|e| {
            tracing::warn!("HTTP task {} {} failed: {}", request.method, request.uri, e);
            GuardError::Transport(e)
        })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            if status == StatusCode::UNAUTHORIZED {
                if let (Some(auth), Some(sent)) = (&self.auth, &token) {
                    auth.provider
                        .invalidate_token(&auth.registration_id, sent)
                        .await?;
                }
            }

            let body = match read_limited(response, self.max_in_memory_size).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    tracing::debug!("Could not read error body from {}: {}", request.uri, e);
                    String::new()
                }
            };
            tracing::debug!("HTTP task {} {} answered {}", request.method, request.uri, status);
            return Ok(RemoteHttpError::new(status, &body).into());
        }

        let bytes = read_limited(response, self.max_in_memory_size).await?;
        Ok(NormalizedResponse::ok(parse_payload(&bytes)))
    }

    fn build_request(
        &self,
        request: &RequestDescription,
        token: Option<&AccessToken>,
    ) -> Result<reqwest::RequestBuilder> {
        let url = reqwest::Url::parse(&request.uri)
            .map_err(|e| GuardError::InvalidRequest(format!("Invalid URI '{}': {}", request.uri, e)))?;

        let mut builder = self.http_client.request(request.method.clone(), url);
        if let Some(timeout) = request.read_timeout {
            builder = builder.timeout(timeout);
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let Some(value) = value else { continue };
            headers.append(header_name(name)?, header_value(name, value)?);
        }
        if let Some(content_type) = &request.content_type {
            headers.insert(CONTENT_TYPE, header_value("Content-Type", content_type)?);
        }
        if let Some(accept) = &request.accept {
            headers.insert(ACCEPT, header_value("Accept", accept)?);
        }
        if let Some(token) = token {
            let bearer = format!("Bearer {}", token.secret());
            headers.insert(AUTHORIZATION, header_value("Authorization", &bearer)?);
        }

        match &request.body {
            None | Some(Value::Null) => {}
            Some(Value::String(text)) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                }
                builder = builder.body(text.clone());
            }
            Some(payload) => {
                let bytes = serde_json::to_vec(payload)?;
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                builder = builder.body(bytes);
            }
        }

        Ok(builder.headers(headers))
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| GuardError::InvalidRequest(format!("Invalid header name '{}'", name)))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| GuardError::InvalidRequest(format!("Invalid value for header '{}'", name)))
}

/// Buffer the response body, failing once it grows past `limit` bytes
async fn read_limited(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(GuardError::BodyTooLarge { limit });
    }

    let mut buffer = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(GuardError::Transport)? {
        if buffer.len() + chunk.len() > limit {
            return Err(GuardError::BodyTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

fn parse_payload(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
