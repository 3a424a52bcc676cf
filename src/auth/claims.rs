//! Claims bundle representation and authority extraction
//!
//! Identity providers nest role information differently. Keycloak-style
//! tokens carry realm roles under `realm_access.roles` and per-client roles
//! under `resource_access.<client>.roles`. Both are flattened here into a
//! single authority set; resource roles keep their scoping as
//! `<resource>_<role>`.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Claim holding realm-level roles
pub const REALM_ACCESS_CLAIM: &str = "realm_access";
/// Claim holding per-resource roles
pub const RESOURCE_ACCESS_CLAIM: &str = "resource_access";
/// Roles list key inside realm and resource entries
pub const ROLES_CLAIM: &str = "roles";

/// Prefix for authorities derived from granted scopes
pub const SCOPE_AUTHORITY_PREFIX: &str = "SCOPE_";

/// Flat set of granted authority strings
pub type Authorities = BTreeSet<String>;

/// A single claim value.
///
/// Arrays holding at least one string become a [`ClaimValue::StringList`] of
/// their string elements; other elements are dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimValue {
    String(String),
    StringList(Vec<String>),
    Map(BTreeMap<String, ClaimValue>),
    /// Numbers, booleans, null and arrays without strings
    Other(Value),
}

impl ClaimValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            ClaimValue::StringList(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ClaimValue>> {
        match self {
            ClaimValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this value is a map
    pub fn get(&self, key: &str) -> Option<&ClaimValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// True for empty strings, lists and maps
    pub fn is_empty(&self) -> bool {
        match self {
            ClaimValue::String(s) => s.is_empty(),
            ClaimValue::StringList(list) => list.is_empty(),
            ClaimValue::Map(map) => map.is_empty(),
            ClaimValue::Other(value) => value.is_null(),
        }
    }
}

impl From<Value> for ClaimValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ClaimValue::String(s),
            Value::Array(items) if items.is_empty() || items.iter().any(Value::is_string) => {
                ClaimValue::StringList(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect(),
                )
            }
            Value::Object(map) => ClaimValue::Map(
                map.into_iter()
                    .map(|(key, value)| (key, ClaimValue::from(value)))
                    .collect(),
            ),
            other => ClaimValue::Other(other),
        }
    }
}

/// Verified token payload, keyed by claim name
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct ClaimsBundle {
    claims: BTreeMap<String, ClaimValue>,
}

impl ClaimsBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a decoded JSON object; non-object values yield an empty bundle
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.claims.get(name)
    }

    /// The `sub` claim when present as a string
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(ClaimValue::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

impl From<Map<String, Value>> for ClaimsBundle {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            claims: map
                .into_iter()
                .map(|(key, value)| (key, ClaimValue::from(value)))
                .collect(),
        }
    }
}

/// Flatten realm and resource roles into an authority set.
///
/// The result always contains every element of `base`. Missing, empty or
/// oddly shaped claims contribute nothing and never fail extraction.
pub fn extract_authorities(claims: &ClaimsBundle, base: &Authorities) -> Authorities {
    let mut authorities = base.clone();

    if let Some(realm_access) = claims.get(REALM_ACCESS_CLAIM).filter(|v| !v.is_empty()) {
        if let Some(roles) = realm_access.get(ROLES_CLAIM).and_then(ClaimValue::as_string_list) {
            authorities.extend(roles.iter().cloned());
        }
    }

    if let Some(resources) = claims
        .get(RESOURCE_ACCESS_CLAIM)
        .and_then(ClaimValue::as_map)
    {
        for (resource, entry) in resources {
            let Some(roles) = entry.get(ROLES_CLAIM).and_then(ClaimValue::as_string_list) else {
                tracing::debug!("No roles list for resource '{}', skipping", resource);
                continue;
            };
            authorities.extend(roles.iter().map(|role| format!("{}_{}", resource, role)));
        }
    }

    authorities
}

/// Authorities derived from granted scopes (`SCOPE_<scope>`).
///
/// Reads a space-delimited `scope` claim, falling back to a `scp` list.
pub fn scope_authorities(claims: &ClaimsBundle) -> Authorities {
    let scopes: Vec<&str> = match (claims.get("scope"), claims.get("scp")) {
        (Some(ClaimValue::String(scope)), _) => scope.split_whitespace().collect(),
        (_, Some(ClaimValue::StringList(scp))) => scp.iter().map(String::as_str).collect(),
        (_, Some(ClaimValue::String(scp))) => scp.split_whitespace().collect(),
        _ => Vec::new(),
    };

    scopes
        .into_iter()
        .filter(|scope| !scope.is_empty())
        .map(|scope| format!("{}{}", SCOPE_AUTHORITY_PREFIX, scope))
        .collect()
}
