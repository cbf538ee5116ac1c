//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a site.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for a site.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Pages directory and per-route overrides.
    pub pages: PagesConfig,

    /// Static build output.
    pub build: BuildConfig,

    /// Markup added to generated documents.
    pub document: DocumentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Pages directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PagesConfig {
    /// Directory scanned for page, layout and root templates.
    pub dir: PathBuf,

    /// Page paths rendered per request instead of at build time.
    pub dynamic: Vec<String>,

    /// Page paths served as a client-only shell.
    pub no_ssr: Vec<String>,

    /// Concrete segment values for static pages with groups,
    /// keyed by page path (e.g. `"/blog/[slug]" = [["a"], ["b"]]`).
    pub static_paths: HashMap<String, Vec<Vec<String>>>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("pages"),
            dynamic: Vec::new(),
            no_ssr: Vec::new(),
            static_paths: HashMap::new(),
        }
    }
}

/// Static build configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Output directory.
    pub out_dir: PathBuf,

    /// Directory (and URL prefix) holding elements maps.
    pub routes_dir: String,

    /// Maximum concurrent file writes.
    pub write_concurrency: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("dist"),
            routes_dir: "_elements".to_string(),
            write_concurrency: 2500,
        }
    }
}

/// Document configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DocumentConfig {
    /// Markup placed in `<head>`.
    pub head: String,

    /// Module script loaded by every document.
    pub client_script: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
