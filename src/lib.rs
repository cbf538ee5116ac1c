//! File-driven page router and incremental UI transfer.
//!
//! Pages, layouts and a root shell are registered (or discovered from a
//! pages directory), assembled per path into an elements map of named
//! slots, and served either as full documents or as incremental maps the
//! client router merges into what it already holds.

pub mod build;
pub mod client;
pub mod config;
pub mod elements;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod render;
pub mod routing;

pub use config::SiteConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, Site};
