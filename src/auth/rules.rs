use http::Method;
use std::collections::HashMap;

use crate::error::{GuardError, Result};

/// Prefix some identity stacks put in front of role authorities
pub const ROLE_AUTHORITY_PREFIX: &str = "ROLE_";

/// Parse a standard HTTP method name (case-insensitive).
///
/// Extension methods are rejected so that a typo in the roles table fails at
/// startup instead of silently never matching.
pub fn parse_method(name: &str) -> Result<Method> {
    match name.trim().to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "HEAD" => Ok(Method::HEAD),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "OPTIONS" => Ok(Method::OPTIONS),
        "TRACE" => Ok(Method::TRACE),
        "CONNECT" => Ok(Method::CONNECT),
        _ => Err(GuardError::Config(format!(
            "Unrecognized HTTP method in roles configuration: '{}'",
            name
        ))),
    }
}

/// Method to allowed-roles table, immutable once built
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<Method, Vec<String>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from method-name strings to role lists.
    ///
    /// Entries naming the same method (e.g. `get` and `GET`) are merged.
    pub fn from_config<'a, I, R>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, R)>,
        R: IntoIterator<Item = &'a String>,
    {
        let mut rules: HashMap<Method, Vec<String>> = HashMap::new();
        for (name, roles) in entries {
            let method = parse_method(name)?;
            let allowed = rules.entry(method).or_default();
            for role in roles {
                if !allowed.contains(role) {
                    allowed.push(role.clone());
                }
            }
        }
        Ok(Self { rules })
    }

    /// Add a rule; used when assembling a rule set in code
    pub fn with_rule(mut self, method: Method, roles: &[&str]) -> Self {
        self.rules
            .entry(method)
            .or_default()
            .extend(roles.iter().map(|r| r.to_string()));
        self
    }

    /// Roles allowed for `method`, or `None` when no rule covers it
    pub fn roles_for(&self, method: &Method) -> Option<&[String]> {
        self.rules.get(method).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// Whether an authority satisfies a required role name
pub fn authority_matches_role(authority: &str, role: &str) -> bool {
    authority == role
        || authority
            .strip_prefix(ROLE_AUTHORITY_PREFIX)
            .is_some_and(|bare| bare == role)
}
