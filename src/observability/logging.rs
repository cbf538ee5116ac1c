//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the filter from `RUST_LOG`, falling back to the configured level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Level configurable via config and environment; environment wins

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("pagetree={},tower_http={}", level, level)
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level).into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
