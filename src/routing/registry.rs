//! Page registry.
//!
//! # Responsibilities
//! - Store static pages, dynamic pages, layouts and the root shell
//! - Expand enumerated static pages into one literal page per tuple
//! - Reject duplicates and invalid configurations
//! - Lock against further registration once configured
//!
//! # Design Decisions
//! - One explicit registry instance per site, passed to whoever needs it
//! - Registration is synchronous and in-memory
//! - Layouts and the root are static-only; dynamic variants are rejected

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use crate::render::Component;
use crate::routing::path_spec::{PathMatcher, PathSegment, PathSpec};

/// Errors raised while registering routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registerPage is no longer available")]
    PageUnavailable,

    #[error("registerLayout is no longer available")]
    LayoutUnavailable,

    #[error("registerRoot is no longer available")]
    RootUnavailable,

    #[error("Duplicated path: {0}")]
    DuplicatedPath(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Whether a route is computed once or on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Static,
    Dynamic,
}

/// Declarative page registration.
#[derive(Debug, Clone)]
pub struct PageConfig {
    pub path: String,
    pub render: RenderMode,
    pub component: Component,
    /// One tuple of concrete values per dynamic segment, in path order.
    pub static_paths: Option<Vec<Vec<String>>>,
    /// Treat `[name]` segments as literal text.
    pub exact: bool,
    /// Serve a client-only shell instead of server-rendered HTML.
    pub no_ssr: bool,
}

impl PageConfig {
    pub fn new(render: RenderMode, path: impl Into<String>, component: Component) -> Self {
        Self {
            path: path.into(),
            render,
            component,
            static_paths: None,
            exact: false,
            no_ssr: false,
        }
    }

    pub fn with_static_paths(mut self, static_paths: Vec<Vec<String>>) -> Self {
        self.static_paths = Some(static_paths);
        self
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    pub fn no_ssr(mut self) -> Self {
        self.no_ssr = true;
        self
    }
}

/// A fully literal page.
#[derive(Debug, Clone)]
pub struct StaticPage {
    pub path_spec: PathSpec,
    /// Pattern the page was registered with; drives the layout chain.
    pub original_spec: PathSpec,
    pub component: Component,
    pub no_ssr: bool,
}

impl StaticPage {
    pub fn path(&self) -> String {
        self.path_spec.to_string()
    }
}

/// A page evaluated per request.
#[derive(Debug, Clone)]
pub struct DynamicPage {
    pub path_spec: PathSpec,
    pub matcher: PathMatcher,
    pub component: Component,
    pub no_ssr: bool,
}

/// All registered routes of one site.
#[derive(Debug, Default)]
pub struct PageRegistry {
    static_pages: Vec<StaticPage>,
    static_index: HashMap<String, usize>,
    dynamic_pages: Vec<DynamicPage>,
    layouts: BTreeMap<String, Component>,
    root: Option<Component>,
    paths: HashSet<String>,
    configured: bool,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page, expanding enumerated static paths eagerly.
    pub fn register_page(&mut self, page: PageConfig) -> Result<(), RegistryError> {
        if self.configured {
            return Err(RegistryError::PageUnavailable);
        }

        let path_spec = if page.exact {
            PathSpec::parse_exact(&page.path)
        } else {
            PathSpec::parse(&page.path)
        };

        match page.render {
            RenderMode::Static if path_spec.is_literal() => {
                self.insert_static(path_spec.clone(), path_spec, page.component, page.no_ssr)
            }
            RenderMode::Static => {
                let Some(static_paths) = page.static_paths else {
                    return Err(RegistryError::InvalidConfig(format!(
                        "static page {} has dynamic segments but no static paths",
                        page.path
                    )));
                };
                let names = group_keys(&path_spec);
                for values in static_paths {
                    let concrete = path_spec.fill(&values).ok_or_else(|| {
                        RegistryError::InvalidConfig(format!(
                            "static path {:?} does not fit {}: expected {} values",
                            values,
                            page.path,
                            path_spec.group_count()
                        ))
                    })?;
                    let baked: BTreeMap<String, String> =
                        names.iter().cloned().zip(values).collect();
                    self.insert_static(
                        concrete,
                        path_spec.clone(),
                        page.component.with_params(baked),
                        page.no_ssr,
                    )?;
                }
                Ok(())
            }
            RenderMode::Dynamic => {
                let key = path_spec.to_string();
                if !self.paths.insert(key.clone()) {
                    return Err(RegistryError::DuplicatedPath(key));
                }
                self.dynamic_pages.push(DynamicPage {
                    matcher: path_spec.to_matcher(),
                    path_spec,
                    component: page.component,
                    no_ssr: page.no_ssr,
                });
                Ok(())
            }
        }
    }

    /// Register a layout for `path` and its descendants.
    pub fn register_layout(
        &mut self,
        render: RenderMode,
        path: &str,
        component: Component,
    ) -> Result<(), RegistryError> {
        if self.configured {
            return Err(RegistryError::LayoutUnavailable);
        }
        if render != RenderMode::Static {
            return Err(RegistryError::InvalidConfig(format!(
                "layout {} must be static",
                path
            )));
        }
        let key = PathSpec::parse(path).to_string();
        if self.layouts.contains_key(&key) {
            return Err(RegistryError::DuplicatedPath(format!("layout {}", key)));
        }
        self.layouts.insert(key, component);
        Ok(())
    }

    /// Register the shell wrapping every page.
    pub fn register_root(
        &mut self,
        render: RenderMode,
        component: Component,
    ) -> Result<(), RegistryError> {
        if self.configured {
            return Err(RegistryError::RootUnavailable);
        }
        if render != RenderMode::Static {
            return Err(RegistryError::InvalidConfig("root must be static".to_string()));
        }
        if self.root.is_some() {
            return Err(RegistryError::DuplicatedPath("root".to_string()));
        }
        self.root = Some(component);
        Ok(())
    }

    /// Lock the registry. Further registration fails.
    pub fn mark_configured(&mut self) {
        if !self.configured {
            tracing::info!(
                static_pages = self.static_pages.len(),
                dynamic_pages = self.dynamic_pages.len(),
                layouts = self.layouts.len(),
                has_root = self.root.is_some(),
                "Page registry configured"
            );
        }
        self.configured = true;
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Static pages in registration order.
    pub fn static_pages(&self) -> &[StaticPage] {
        &self.static_pages
    }

    pub fn static_page(&self, path: &str) -> Option<&StaticPage> {
        self.static_index.get(path).map(|&index| &self.static_pages[index])
    }

    /// Dynamic pages in registration order.
    pub fn dynamic_pages(&self) -> &[DynamicPage] {
        &self.dynamic_pages
    }

    pub fn layout(&self, path: &str) -> Option<&Component> {
        self.layouts.get(path)
    }

    pub fn layout_paths(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(String::as_str)
    }

    pub fn root(&self) -> Option<&Component> {
        self.root.as_ref()
    }

    fn insert_static(
        &mut self,
        path_spec: PathSpec,
        original_spec: PathSpec,
        component: Component,
        no_ssr: bool,
    ) -> Result<(), RegistryError> {
        let key = path_spec.to_string();
        if !self.paths.insert(key.clone()) {
            return Err(RegistryError::DuplicatedPath(key));
        }
        self.static_index.insert(key, self.static_pages.len());
        self.static_pages.push(StaticPage {
            path_spec,
            original_spec,
            component,
            no_ssr,
        });
        Ok(())
    }
}

// Unnamed groups are keyed by their position among the groups.
fn group_keys(spec: &PathSpec) -> Vec<String> {
    spec.segments()
        .iter()
        .filter(|segment| segment.is_group())
        .enumerate()
        .map(|(index, segment)| match segment {
            PathSegment::Group(Some(name)) => name.clone(),
            _ => index.to_string(),
        })
        .collect()
}
