use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::sync::Arc;
use tower::Layer;
use tower::Service;

use super::claims::{scope_authorities, Authorities, ClaimsBundle};
use super::error::AuthorizationError;
use super::gate::AuthorizationGate;
use crate::axum_integration::{extract_bearer_token, Principal};

/// Output of a successful bearer token verification
#[derive(Debug, Clone, Default)]
pub struct VerifiedToken {
    pub claims: ClaimsBundle,
    /// Authorities from standard token fields; scope authorities are used when `None`
    pub base_authorities: Option<Authorities>,
}

/// Verifies bearer tokens (signature, issuer, expiry) on behalf of the gate
pub trait TokenVerifier: Send + Sync + 'static {
    fn verify(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<VerifiedToken, AuthorizationError>> + Send;
}

type BoxFuture<T, E> = std::pin::Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// Middleware layer that turns a bearer token into a [`Principal`].
///
/// When disabled, tokens are not inspected and every request passes through.
pub struct Authenticate<V> {
    verifier: Arc<V>,
    enabled: bool,
}

impl<V> Authenticate<V> {
    pub fn new(verifier: V) -> Self {
        Self {
            verifier: Arc::new(verifier),
            enabled: true,
        }
    }

    /// Verify tokens only if `gate` is enforcing
    pub fn for_gate(verifier: V, gate: &AuthorizationGate) -> Self {
        Self::new(verifier).enabled(gate.is_enabled())
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl<V> Clone for Authenticate<V> {
    fn clone(&self) -> Self {
        Self {
            verifier: self.verifier.clone(),
            enabled: self.enabled,
        }
    }
}

impl<S, V> Layer<S> for Authenticate<V> {
    type Service = AuthenticateMiddleware<S, V>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthenticateMiddleware {
            inner,
            verifier: self.verifier.clone(),
            enabled: self.enabled,
        }
    }
}

pub struct AuthenticateMiddleware<S, V> {
    inner: S,
    verifier: Arc<V>,
    enabled: bool,
}

impl<S: Clone, V> Clone for AuthenticateMiddleware<S, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            verifier: self.verifier.clone(),
            enabled: self.enabled,
        }
    }
}

impl<S, V> Service<Request> for AuthenticateMiddleware<S, V>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    V: TokenVerifier,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let verifier = self.verifier.clone();
        let enabled = self.enabled;

        Box::pin(async move {
            if !enabled {
                return inner.call(request).await;
            }

            // Anonymous requests pass through; the gate decides what they may do
            if let Some(token) = extract_bearer_token(request.headers()) {
                match verifier.verify(&token).await {
                    Ok(verified) => {
                        let base = verified
                            .base_authorities
                            .unwrap_or_else(|| scope_authorities(&verified.claims));
                        let principal = Principal::from_claims(&verified.claims, &base);
                        tracing::debug!(
                            "Authenticated {:?} with {} authorities",
                            principal.subject(),
                            principal.authorities().len()
                        );
                        request.extensions_mut().insert(principal);
                    }
                    Err(err) => {
                        tracing::debug!("Bearer token rejected: {}", err);
                        return Ok(err.into_response());
                    }
                }
            }

            inner.call(request).await
        })
    }
}

/// Middleware layer enforcing an [`AuthorizationGate`]
#[derive(Clone)]
pub struct Authorize {
    gate: AuthorizationGate,
}

impl Authorize {
    pub fn new(gate: AuthorizationGate) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for Authorize {
    type Service = AuthorizeMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizeMiddleware {
            inner,
            gate: self.gate.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthorizeMiddleware<S> {
    inner: S,
    gate: AuthorizationGate,
}

impl<S> Service<Request> for AuthorizeMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let decision = self
            .gate
            .evaluate(request.method(), request.extensions().get::<Principal>());
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match decision {
                Ok(()) => inner.call(request).await,
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::gate::UnmatchedPolicy;
    use crate::auth::rules::RuleSet;
    use axum::body::Body;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use std::collections::HashMap;

    /// Accepts a fixed set of tokens
    struct StaticVerifier {
        tokens: HashMap<String, ClaimsBundle>,
    }

    impl StaticVerifier {
        fn new() -> Self {
            let mut tokens = HashMap::new();
            tokens.insert(
                "viewer-token".to_string(),
                ClaimsBundle::from_json(json!({
                    "sub": "alice",
                    "scope": "openid",
                    "realm_access": {"roles": ["viewer"]}
                })),
            );
            tokens.insert(
                "plain-token".to_string(),
                ClaimsBundle::from_json(json!({"sub": "bob"})),
            );
            Self { tokens }
        }
    }

    impl TokenVerifier for StaticVerifier {
        async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthorizationError> {
            self.tokens
                .get(token)
                .cloned()
                .map(|claims| VerifiedToken {
                    claims,
                    base_authorities: None,
                })
                .ok_or_else(|| AuthorizationError::InvalidToken("unknown token".to_string()))
        }
    }

    fn request(method: Method, token: Option<&str>) -> Request {
        let mut builder = Request::builder().method(method).uri("/api/workflow");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn viewer_gate() -> AuthorizationGate {
        AuthorizationGate::new(
            RuleSet::new().with_rule(Method::GET, &["viewer"]),
            UnmatchedPolicy::Authenticated,
        )
    }

    async fn status_of(gate: AuthorizationGate, request: Request) -> StatusCode {
        let authenticate = Authenticate::for_gate(StaticVerifier::new(), &gate);
        // Create a simple echo service
        let echo_service = tower::service_fn(|_req: Request| async {
            Ok::<Response, std::convert::Infallible>("OK".into_response())
        });

        let mut service = tower::ServiceBuilder::new()
            .layer(authenticate)
            .layer(Authorize::new(gate))
            .service(echo_service);

        service.call(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_authenticate_inserts_principal() {
        let echo_service = tower::service_fn(|req: Request| async move {
            let principal = req.extensions().get::<Principal>().cloned().unwrap();
            assert!(principal.has_authority("viewer"));
            assert!(principal.has_authority("SCOPE_openid"));
            assert_eq!(principal.subject(), Some("alice"));
            Ok::<Response, std::convert::Infallible>("OK".into_response())
        });

        let mut service = tower::ServiceBuilder::new()
            .layer(Authenticate::new(StaticVerifier::new()))
            .service(echo_service);

        let response = service
            .call(request(Method::GET, Some("viewer-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let status = status_of(viewer_gate(), request(Method::GET, Some("forged"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_viewer_permitted_on_get() {
        let status = status_of(viewer_gate(), request(Method::GET, Some("viewer-token"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_principal_without_role_forbidden() {
        let status = status_of(viewer_gate(), request(Method::GET, Some("plain-token"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unmatched_method_authenticated_default() {
        let status = status_of(viewer_gate(), request(Method::POST, Some("plain-token"))).await;
        assert_eq!(status, StatusCode::OK);

        let status = status_of(viewer_gate(), request(Method::POST, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_disabled_gate_permits_anonymous() {
        let status = status_of(AuthorizationGate::disabled(), request(Method::DELETE, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_disabled_gate_ignores_rejected_token() {
        let status = status_of(AuthorizationGate::disabled(), request(Method::GET, Some("forged"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_disabled_authenticate_skips_verification() {
        let echo_service = tower::service_fn(|req: Request| async move {
            assert!(req.extensions().get::<Principal>().is_none());
            Ok::<Response, std::convert::Infallible>("OK".into_response())
        });

        let layer = Authenticate::new(StaticVerifier::new()).enabled(false);
        assert!(!layer.is_enabled());
        let mut service = tower::ServiceBuilder::new().layer(layer).service(echo_service);

        let response = service
            .call(request(Method::GET, Some("viewer-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
