//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every request span
//! - Metrics are cheap (atomic increments) and no-ops without a recorder

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
