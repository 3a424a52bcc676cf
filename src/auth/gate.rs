use http::Method;
use std::sync::Arc;

use super::error::AuthorizationError;
use super::rules::RuleSet;
use crate::axum_integration::Principal;

/// Treatment of requests whose method has no configured rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedPolicy {
    /// Any authenticated principal is permitted
    #[default]
    Authenticated,
    /// Everyone is permitted, authenticated or not
    PermitAll,
}

/// Permit/deny decision for inbound requests.
///
/// Holds no mutable state; clones share the same rule set.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    enabled: bool,
    rules: Arc<RuleSet>,
    unmatched: UnmatchedPolicy,
}

impl AuthorizationGate {
    pub fn new(rules: RuleSet, unmatched: UnmatchedPolicy) -> Self {
        Self {
            enabled: true,
            rules: Arc::new(rules),
            unmatched,
        }
    }

    /// A gate that permits every request
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            rules: Arc::new(RuleSet::new()),
            unmatched: UnmatchedPolicy::PermitAll,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Decide whether `principal` may issue a request with `method`
    pub fn evaluate(
        &self,
        method: &Method,
        principal: Option<&Principal>,
    ) -> Result<(), AuthorizationError> {
        if !self.enabled {
            return Ok(());
        }

        match self.rules.roles_for(method) {
            Some(required) => {
                let principal = principal.ok_or(AuthorizationError::MissingToken)?;
                if principal.has_any_role(required) {
                    Ok(())
                } else {
                    tracing::debug!(
                        "Denying {} for {:?}: none of the required roles {:?}",
                        method,
                        principal.subject(),
                        required
                    );
                    Err(AuthorizationError::InsufficientRole(required.to_vec()))
                }
            }
            None => match (self.unmatched, principal) {
                (UnmatchedPolicy::PermitAll, _) | (UnmatchedPolicy::Authenticated, Some(_)) => {
                    Ok(())
                }
                (UnmatchedPolicy::Authenticated, None) => Err(AuthorizationError::MissingToken),
            },
        }
    }
}
