//! Inbound authorization: claims flattening, method/role rules and middleware
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use tower::ServiceBuilder;
//! use workflow_guard::auth::{Authenticate, Authorize};
//!
//! let gate = config.build_gate()?;
//! let app = Router::new()
//!     .route("/api/workflow", post(start_workflow))
//!     .layer(ServiceBuilder::new()
//!         .layer(Authenticate::new(my_verifier))
//!         .layer(Authorize::new(gate))
//!     );
//! ```

pub mod claims;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod rules;

pub use claims::{extract_authorities, scope_authorities, Authorities, ClaimValue, ClaimsBundle};
pub use error::AuthorizationError;
pub use gate::{AuthorizationGate, UnmatchedPolicy};
pub use middleware::{Authenticate, Authorize, TokenVerifier, VerifiedToken};
pub use rules::{parse_method, RuleSet};
