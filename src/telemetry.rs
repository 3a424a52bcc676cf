//! Logging setup for hosts embedding the guard

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global fmt subscriber honouring `RUST_LOG` (default `info`).
///
/// Panics if a global subscriber is already set; see [`try_init_tracing`].
pub fn init_tracing() {
    let fmt_layer = fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt_layer)
        .init();
}

/// Like [`init_tracing`], returning `false` when a subscriber already exists
pub fn try_init_tracing() -> bool {
    let fmt_layer = fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
