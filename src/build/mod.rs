//! Static build subsystem.
//!
//! # Data Flow
//! ```text
//! Route configs (static, literal pathname only)
//!     → builder.rs pass 1: elements map per route
//!         → <out>/<routes_dir>/<encoded file path>.txt
//!     → builder.rs pass 2: cached map → document
//!         → <out>/<pathname>/index.html | <out>/404.html
//!     → task_queue.rs (bounded concurrent writes, wait_for_tasks barrier)
//! ```

pub mod builder;
pub mod task_queue;

pub use builder::{html_file_path, BuildError, BuildReport, SiteBuilder};
pub use task_queue::TaskQueue;
