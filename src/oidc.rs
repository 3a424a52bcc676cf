//! Outbound OAuth2 support
//!
//! This module provides the client-credentials token provider used to
//! authenticate HTTP task calls.

pub mod client;
pub mod types;

pub use client::*;
pub use types::*;
