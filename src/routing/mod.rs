//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     pages directory / explicit PageConfig list
//!     → fs.rs (naming conventions, component loader)
//!     → registry.rs (expand static paths, reject duplicates, lock)
//!     → pages.rs (declare route items, render slot trees)
//!     → route_config.rs (normalize + cache, once)
//!
//! Incoming Path:
//!     → route_config.rs (first matching route config)
//!     → resolver.rs (page lookup, layout chain)
//!     → Return: matched route or explicit no-match
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route
//! - Static before dynamic; fewer dynamic segments before more

pub mod fs;
pub mod pages;
pub mod path_spec;
pub mod registry;
pub mod resolver;
pub mod route_config;

pub use path_spec::{PathMatcher, PathSegment, PathSpec};
pub use pages::PageRouter;
pub use registry::{PageConfig, PageRegistry, RegistryError, RenderMode};
pub use resolver::{PageRoute, RouteResolver};
pub use route_config::{RouteConfig, RouteConfigError, RouteConfigManager, RouteSource};
