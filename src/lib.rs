//! # workflow-guard
//!
//! Security and outbound-call plumbing for a workflow orchestrator.
//!
//! ## Features
//!
//! - `auth`: flattens bearer-token role claims into authorities and gates
//!   API calls by HTTP method and role
//! - `oidc`: client-credentials tokens for authenticated outbound calls
//! - `http_task`: executes a workflow task's HTTP call and normalizes the
//!   outcome, keeping remote errors apart from transport failures

pub mod error;
pub use error::{GuardError, Result};

pub mod auth;
pub mod axum_integration;
pub mod config;
pub mod http_task;
pub mod oidc;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use crate::auth::{
    extract_authorities, AuthorizationError, AuthorizationGate, Authorities, ClaimsBundle,
    RuleSet, UnmatchedPolicy,
};
pub use crate::axum_integration::Principal;
pub use crate::config::{load_config, GuardConfig, SecurityConfig};
pub use crate::http_task::{HttpTaskExecutor, NormalizedResponse, RequestDescription, ResponseBody};
pub use crate::oidc::{AccessToken, ClientCredentialsProvider, ClientRegistration};
