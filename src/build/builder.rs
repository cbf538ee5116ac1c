//! Static site builder.
//!
//! # Responsibilities
//! - Pass 1: compute each static route's elements map once and write it
//!   under the routes directory
//! - Pass 2: write each static route's document (shell when server
//!   rendering is disabled) from the cached map
//!
//! # Design Decisions
//! - Dynamic routes produce no artifacts; they are evaluated at serve time
//! - All file writes go through a bounded task queue
//! - The first failure aborts the build

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::HeaderMap;
use dashmap::DashMap;
use thiserror::Error;

use crate::build::task_queue::TaskQueue;
use crate::elements::{
    encode_file_path, encode_route_path, Elements, EncodingError, EntriesError, EntriesManager,
    ELEMENTS_FILE_EXTENSION,
};
use crate::observability::metrics;
use crate::render::{RenderError, Renderer};
use crate::routing::route_config::{RouteConfigError, NOT_FOUND_PATH};

/// Errors raised while building a site.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Entries(#[from] EntriesError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Config(#[from] RouteConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No elements produced for static route {0}")]
    MissingEntries(String),

    #[error("Write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Files written by one build, relative to the output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub elements_files: Vec<PathBuf>,
    pub html_files: Vec<PathBuf>,
}

/// Emits every static route to disk.
pub struct SiteBuilder {
    entries: EntriesManager,
    renderer: Arc<dyn Renderer>,
    out_dir: PathBuf,
    routes_dir: String,
    write_concurrency: usize,
}

impl SiteBuilder {
    pub fn new(entries: EntriesManager, renderer: Arc<dyn Renderer>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            entries,
            renderer,
            out_dir: out_dir.into(),
            routes_dir: "_elements".to_string(),
            write_concurrency: 2500,
        }
    }

    pub fn with_routes_dir(mut self, routes_dir: impl Into<String>) -> Self {
        self.routes_dir = routes_dir.into().trim_matches('/').to_string();
        self
    }

    pub fn with_write_concurrency(mut self, limit: usize) -> Self {
        self.write_concurrency = limit;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub async fn build(&self) -> Result<BuildReport, BuildError> {
        let configs = self.entries.routes().configs()?;
        let pathnames: Vec<(&str, bool)> = configs
            .iter()
            .filter(|config| config.is_buildable())
            .filter_map(|config| config.pathname.as_deref().map(|path| (path, config.no_ssr)))
            .collect();
        let skipped = configs.len() - pathnames.len();

        let mut queue: TaskQueue<BuildError> = TaskQueue::new(self.write_concurrency);
        let mut report = BuildReport::default();
        let cache: DashMap<String, Arc<Elements>> = DashMap::new();

        for (pathname, _) in &pathnames {
            let encoded = encode_route_path(pathname)?;
            let elements = self
                .entries
                .get_entries(&encoded, None, &HeaderMap::new())?
                .ok_or_else(|| BuildError::MissingEntries(pathname.to_string()))?;
            let body = self.renderer.render_elements(&elements)?;
            cache.insert(pathname.to_string(), Arc::new(elements));

            let relative =
                Path::new(&self.routes_dir).join(encode_file_path(&encoded, ELEMENTS_FILE_EXTENSION));
            queue.add(write_file(self.out_dir.join(&relative), body.to_vec(), "elements"));
            report.elements_files.push(relative);
        }

        for (pathname, no_ssr) in &pathnames {
            let html = if *no_ssr {
                self.renderer.render_shell()
            } else {
                let elements = cache
                    .get(*pathname)
                    .map(|entry| entry.value().clone())
                    .ok_or_else(|| BuildError::MissingEntries(pathname.to_string()))?;
                self.renderer.render_html(&elements, pathname)?
            };

            let relative = html_file_path(pathname);
            queue.add(write_file(self.out_dir.join(&relative), html.into_bytes(), "html"));
            report.html_files.push(relative);
        }

        let written = queue.wait_for_tasks().await?;
        tracing::info!(
            out_dir = %self.out_dir.display(),
            routes = pathnames.len(),
            skipped_dynamic = skipped,
            files = written,
            "Static build complete"
        );
        Ok(report)
    }
}

/// `pathname/index.html`, or `404.html` for the not-found route.
pub fn html_file_path(pathname: &str) -> PathBuf {
    if pathname == NOT_FOUND_PATH {
        return PathBuf::from("404.html");
    }
    let trimmed = pathname.trim_matches('/');
    if trimmed.is_empty() {
        PathBuf::from("index.html")
    } else {
        Path::new(trimmed).join("index.html")
    }
}

async fn write_file(path: PathBuf, contents: Vec<u8>, kind: &'static str) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| BuildError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(&path, contents)
        .await
        .map_err(|source| BuildError::Io {
            path: path.clone(),
            source,
        })?;
    metrics::record_build_artifact(kind);
    tracing::debug!(path = %path.display(), kind, "Wrote build artifact");
    Ok(())
}
