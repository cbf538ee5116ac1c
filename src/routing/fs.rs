//! File-based route table.
//!
//! # Naming Conventions
//! ```text
//! index.html              → page /
//! about.html              → page /about
//! blog/index.html         → page /blog
//! blog/[slug].html        → page /blog/[slug]
//! blog/_layout.html       → layout /blog
//! _layout/index.html      → layout /
//! _root.html              → root shell
//! _partials/nav.html      → ignored (private helper)
//! ```
//!
//! # Design Decisions
//! - The file list is enumerated up front; nothing is loaded while walking
//! - Components are resolved through an injectable `ComponentLoader`
//! - Render mode, static paths and SSR opt-outs come from configuration

use std::collections::{HashMap, HashSet};
use std::path::Path;

use thiserror::Error;

use crate::render::template::TemplateError;
use crate::render::Component;
use crate::routing::registry::{PageConfig, PageRegistry, RegistryError, RenderMode};

/// Errors raised while loading a component.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid template {reference}: {source}")]
    Template {
        reference: String,
        #[source]
        source: TemplateError,
    },
}

/// Errors raised while building the route table from files.
#[derive(Debug, Error)]
pub enum FileRouteError {
    #[error("Failed to scan pages directory: {0}")]
    Scan(#[from] std::io::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Resolves a component reference (a relative file path) to a component.
pub trait ComponentLoader: Send + Sync {
    fn load(&self, reference: &str) -> Result<Component, LoadError>;
}

/// What a file contributes to the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRoute {
    Page(String),
    Layout(String),
    Root,
    Ignored,
}

impl FileRoute {
    /// Classify a relative file path using the naming conventions.
    pub fn classify(relative: &str) -> FileRoute {
        let (dir, file) = relative.rsplit_once('/').unwrap_or(("", relative));
        let stem = match file.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file,
        };
        let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
        segments.push(stem);

        // `_layout/index` and `_root/index` behave like `_layout` and `_root`.
        if segments.len() >= 2 && segments.last() == Some(&"index") {
            let parent = segments[segments.len() - 2];
            if parent == "_layout" || parent == "_root" {
                segments.pop();
            }
        }

        let Some((&last, dirs)) = segments.split_last() else {
            return FileRoute::Ignored;
        };
        if dirs.iter().any(|dir| dir.starts_with('_')) {
            return FileRoute::Ignored;
        }

        let dir_path = format!("/{}", dirs.join("/"));
        match last {
            "_layout" => FileRoute::Layout(dir_path),
            "_root" if dirs.is_empty() => FileRoute::Root,
            _ if last.starts_with('_') => FileRoute::Ignored,
            "index" => FileRoute::Page(dir_path),
            _ if dirs.is_empty() => FileRoute::Page(format!("/{}", last)),
            _ => FileRoute::Page(format!("{}/{}", dir_path, last)),
        }
    }
}

/// Per-route settings that files cannot express.
#[derive(Debug, Clone, Default)]
pub struct FileRouteOptions {
    pub dynamic: HashSet<String>,
    pub no_ssr: HashSet<String>,
    pub static_paths: HashMap<String, Vec<Vec<String>>>,
}

/// Pre-enumerated `(route, component reference)` pairs.
#[derive(Debug, Clone, Default)]
pub struct FileRoutes {
    entries: Vec<(FileRoute, String)>,
}

impl FileRoutes {
    pub fn from_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = files
            .into_iter()
            .map(Into::into)
            .map(|file: String| (FileRoute::classify(&file), file))
            .filter(|(route, _)| *route != FileRoute::Ignored)
            .collect();
        Self { entries }
    }

    /// Walk `dir` and classify every file in it.
    pub fn scan(dir: &Path) -> Result<Self, FileRouteError> {
        let mut files = Vec::new();
        collect_files(dir, dir, &mut files)?;
        files.sort();
        Ok(Self::from_files(files))
    }

    pub fn entries(&self) -> &[(FileRoute, String)] {
        &self.entries
    }

    /// Load every component and register it.
    pub fn register(
        &self,
        registry: &mut PageRegistry,
        loader: &dyn ComponentLoader,
        options: &FileRouteOptions,
    ) -> Result<(), FileRouteError> {
        for (route, reference) in &self.entries {
            let component = match route {
                FileRoute::Ignored => continue,
                _ => loader.load(reference)?,
            };
            match route {
                FileRoute::Page(path) => {
                    let render = if options.dynamic.contains(path) {
                        RenderMode::Dynamic
                    } else {
                        RenderMode::Static
                    };
                    let mut page = PageConfig::new(render, path.clone(), component);
                    if let Some(static_paths) = options.static_paths.get(path) {
                        page = page.with_static_paths(static_paths.clone());
                    }
                    if options.no_ssr.contains(path) {
                        page = page.no_ssr();
                    }
                    registry.register_page(page)?;
                }
                FileRoute::Layout(path) => {
                    registry.register_layout(RenderMode::Static, path, component)?
                }
                FileRoute::Root => registry.register_root(RenderMode::Static, component)?,
                FileRoute::Ignored => {}
            }
            tracing::debug!(file = %reference, route = ?route, "Registered file route");
        }
        Ok(())
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let relative: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.push(relative.join("/"));
        }
    }
    Ok(())
}
