//! Axum integration for inbound authorization
//!
//! This module provides utilities for integrating the gate with Axum:
//! - Bearer token extraction from request headers
//! - The authenticated [`Principal`] and its `FromRequestParts` extractor
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{routing::get, Router};
//! use workflow_guard::axum_integration::Principal;
//!
//! async fn whoami(principal: Principal) -> String {
//!     format!("{:?}", principal.authorities())
//! }
//!
//! let app = Router::new().route("/whoami", get(whoami));
//! ```

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};

use crate::auth::claims::{extract_authorities, Authorities, ClaimsBundle};
use crate::auth::rules::authority_matches_role;

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
}

/// An authenticated caller and the authorities granted to it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Principal {
    subject: Option<String>,
    authorities: Authorities,
}

impl Principal {
    pub fn new(subject: Option<String>, authorities: Authorities) -> Self {
        Self {
            subject,
            authorities,
        }
    }

    /// Build a principal from a verified token's claims
    pub fn from_claims(claims: &ClaimsBundle, base: &Authorities) -> Self {
        Self {
            subject: claims.subject().map(str::to_string),
            authorities: extract_authorities(claims, base),
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn authorities(&self) -> &Authorities {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// Check if the principal holds any of the provided roles
    pub fn has_any_role(&self, roles: &[String]) -> bool {
        roles.iter().any(|role| {
            self.authorities
                .iter()
                .any(|authority| authority_matches_role(authority, role))
        })
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
