use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::collections::HashMap;
use tower::{ServiceBuilder, ServiceExt};

use workflow_guard::auth::{AuthorizationError, Authorize, TokenVerifier, VerifiedToken};
use workflow_guard::{ClaimsBundle, GuardConfig, Principal};

const CONFIG: &str = r#"
[security]
enabled = true

[security.roles]
GET = ["viewer", "conductor_admin"]
DELETE = ["conductor_admin"]
"#;

#[derive(Clone)]
struct FixedTokens(HashMap<&'static str, serde_json::Value>);

impl TokenVerifier for FixedTokens {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthorizationError> {
        let claims = self
            .0
            .get(token)
            .cloned()
            .ok_or_else(|| AuthorizationError::InvalidToken("signature mismatch".to_string()))?;
        Ok(VerifiedToken {
            claims: ClaimsBundle::from_json(claims),
            base_authorities: None,
        })
    }
}

fn verifier() -> FixedTokens {
    let mut tokens = HashMap::new();
    tokens.insert(
        "realm-viewer",
        json!({"sub": "alice", "realm_access": {"roles": ["viewer"]}}),
    );
    tokens.insert(
        "client-admin",
        json!({
            "sub": "ops-bot",
            "resource_access": {
                "conductor": {"roles": ["admin"]},
                "account": {}
            }
        }),
    );
    tokens.insert("no-roles", json!({"sub": "bob", "scope": "openid"}));
    FixedTokens(tokens)
}

fn app(config: &str) -> Router {
    let config = GuardConfig::from_toml_str(config).unwrap();
    config.validate().unwrap();
    let gate = config.build_gate().unwrap();

    Router::new()
        .route(
            "/api/workflow",
            get(|principal: Principal| async move {
                principal.subject().unwrap_or_default().to_string()
            })
            .post(|| async { "started" })
            .delete(|| async { "terminated" }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(config.build_authenticate(verifier()))
                .layer(Authorize::new(gate)),
        )
}

async fn call(app: Router, method: &str, token: Option<&str>) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri("/api/workflow");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn realm_role_grants_get() {
    let (status, body) = call(app(CONFIG), "GET", Some("realm-viewer")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "alice");
}

#[tokio::test]
async fn resource_role_grants_delete() {
    let (status, _) = call(app(CONFIG), "DELETE", Some("client-admin")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn realm_viewer_cannot_delete() {
    let (status, body) = call(app(CONFIG), "DELETE", Some("realm-viewer")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("conductor_admin"));
}

#[tokio::test]
async fn principal_without_roles_denied_on_get() {
    let (status, _) = call(app(CONFIG), "GET", Some("no-roles")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unmatched_method_needs_authentication() {
    let (status, _) = call(app(CONFIG), "POST", Some("no-roles")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(app(CONFIG), "POST", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn open_fallback_permits_anonymous_unmatched() {
    let config = CONFIG.replace("enabled = true", "enabled = true\npermit_unmatched = true");
    let (status, body) = call(app(&config), "POST", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "started");
}

#[tokio::test]
async fn forged_token_rejected() {
    let (status, _) = call(app(CONFIG), "GET", Some("forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disabled_security_permits_everything() {
    let config = CONFIG.replace("enabled = true", "enabled = false");
    let (status, _) = call(app(&config), "DELETE", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(app(&config), "POST", Some("expired-or-forged")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "started");
}
