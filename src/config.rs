//! Configuration parsing module
//!
//! Loads the security and outbound-call settings from a TOML file and builds
//! the runtime components from them.
//!
//! # Example
//!
//! ```rust,ignore
//! use workflow_guard::config::load_config;
//!
//! let config = load_config("guard.toml")?;
//! let gate = config.build_gate()?;
//! let executor = config.build_executor()?;
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::auth::gate::{AuthorizationGate, UnmatchedPolicy};
use crate::auth::middleware::{Authenticate, TokenVerifier};
use crate::auth::rules::RuleSet;
use crate::http_task::executor::{HttpTaskExecutor, DEFAULT_MAX_IN_MEMORY_SIZE};
use crate::oidc::client::ClientCredentialsProvider;
use crate::oidc::types::ClientRegistration;
use crate::{GuardError, Result};

fn default_client_registration_id() -> String {
    "oidc".to_string()
}

fn default_client_max_in_memory_size() -> usize {
    DEFAULT_MAX_IN_MEMORY_SIZE
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Security section
    #[serde(default)]
    pub security: SecurityConfig,

    /// OAuth2 client registrations keyed by registration ID
    #[serde(default)]
    pub client_registrations: HashMap<String, ClientRegistration>,
}

/// Authorization and outbound-authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Enforce the roles table; when false every request is permitted
    #[serde(default)]
    pub enabled: bool,

    /// HTTP method name to the roles allowed to call it
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,

    /// Let requests whose method has no rule through without authentication
    #[serde(default)]
    pub permit_unmatched: bool,

    /// Attach client-credentials tokens to HTTP task calls
    #[serde(default)]
    pub outbound_auth_enabled: bool,

    /// Registration used for outbound calls
    #[serde(default = "default_client_registration_id")]
    pub client_registration_id: String,

    /// Maximum buffered response body size in bytes
    #[serde(default = "default_client_max_in_memory_size")]
    pub client_max_in_memory_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            roles: BTreeMap::new(),
            permit_unmatched: false,
            outbound_auth_enabled: false,
            client_registration_id: default_client_registration_id(),
            client_max_in_memory_size: default_client_max_in_memory_size(),
        }
    }
}

impl GuardConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_config(path)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| GuardError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Check everything that must fail at startup rather than per request
    pub fn validate(&self) -> Result<()> {
        self.rule_set()?;

        if self.security.outbound_auth_enabled
            && !self
                .client_registrations
                .contains_key(&self.security.client_registration_id)
        {
            return Err(GuardError::Config(format!(
                "Outbound authentication enabled but client registration '{}' is not configured",
                self.security.client_registration_id
            )));
        }

        if self.security.client_max_in_memory_size == 0 {
            return Err(GuardError::Config(
                "client_max_in_memory_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the method/role table
    pub fn rule_set(&self) -> Result<RuleSet> {
        RuleSet::from_config(&self.security.roles)
    }

    /// Build the inbound authorization gate
    pub fn build_gate(&self) -> Result<AuthorizationGate> {
        if !self.security.enabled {
            tracing::warn!("Authorization disabled; all requests will be permitted");
            return Ok(AuthorizationGate::disabled());
        }

        let rules = self.rule_set()?;
        let unmatched = if self.security.permit_unmatched {
            UnmatchedPolicy::PermitAll
        } else {
            UnmatchedPolicy::Authenticated
        };
        tracing::info!(
            "Authorization enabled with rules for {} HTTP methods (unmatched: {:?})",
            rules.len(),
            unmatched
        );

        Ok(AuthorizationGate::new(rules, unmatched))
    }

    /// Build the bearer-token layer; it passes everything through while authorization is off
    pub fn build_authenticate<V: TokenVerifier>(&self, verifier: V) -> Authenticate<V> {
        Authenticate::new(verifier).enabled(self.security.enabled)
    }

    /// Build the HTTP task executor, with a token provider when outbound auth is on
    pub fn build_executor(&self) -> Result<HttpTaskExecutor> {
        self.validate()?;

        let executor = HttpTaskExecutor::new(self.security.client_max_in_memory_size);
        if !self.security.outbound_auth_enabled {
            return Ok(executor);
        }

        tracing::info!(
            "Outbound authentication enabled using client registration '{}'",
            self.security.client_registration_id
        );
        let provider = ClientCredentialsProvider::new(self.client_registrations.clone());
        Ok(executor.with_token_provider(provider, self.security.client_registration_id.clone()))
    }
}

/// Load configuration from a TOML file
///
/// # Example
///
/// ```rust,ignore
/// let config = workflow_guard::config::load_config("guard.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GuardConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    GuardConfig::from_toml_str(&content)
}
