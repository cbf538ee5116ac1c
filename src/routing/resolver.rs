//! Route resolution against a page registry.
//!
//! # Responsibilities
//! - Compute the layout chain for a path (root-most first)
//! - Find the page serving a concrete path
//!
//! # Design Decisions
//! - Static pages win over dynamic ones for the same path
//! - Dynamic patterns are tried fewest-groups first, then in
//!   registration order, so the most literal pattern wins
//! - Built once from a configured registry; read-only afterwards

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::render::Component;
use crate::routing::path_spec::PathSpec;
use crate::routing::registry::{DynamicPage, PageRegistry};

/// Result of looking up the page for a path.
#[derive(Debug, Clone)]
pub enum PageRoute {
    Static {
        path: String,
        original_spec: PathSpec,
        component: Component,
        no_ssr: bool,
    },
    Dynamic {
        path: String,
        path_spec: PathSpec,
        params: BTreeMap<String, String>,
        component: Component,
        no_ssr: bool,
    },
}

impl PageRoute {
    pub fn path(&self) -> &str {
        match self {
            PageRoute::Static { path, .. } | PageRoute::Dynamic { path, .. } => path,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, PageRoute::Static { .. })
    }

    /// Spec the layout chain is computed from.
    pub fn layout_spec(&self) -> PathSpec {
        match self {
            PageRoute::Static { original_spec, .. } => original_spec.clone(),
            PageRoute::Dynamic { path_spec, .. } => path_spec.clone(),
        }
    }
}

/// Read-only lookups over a configured registry.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    registry: Arc<PageRegistry>,
    dynamic_order: Vec<usize>,
}

impl RouteResolver {
    pub fn new(registry: Arc<PageRegistry>) -> Self {
        let mut dynamic_order: Vec<usize> = (0..registry.dynamic_pages().len()).collect();
        // Stable sort keeps registration order among equal group counts.
        dynamic_order.sort_by_key(|&index| registry.dynamic_pages()[index].path_spec.group_count());
        Self {
            registry,
            dynamic_order,
        }
    }

    pub fn registry(&self) -> &Arc<PageRegistry> {
        &self.registry
    }

    /// Ancestor paths of `spec` (inclusive) that have a layout, root-most first.
    pub fn get_layouts(&self, spec: &PathSpec) -> Vec<String> {
        (0..=spec.len())
            .map(|len| spec.prefix(len).to_string())
            .filter(|path| self.registry.layout(path).is_some())
            .collect()
    }

    /// The page serving `path`, if any.
    pub fn get_page_route_path(&self, path: &str) -> Option<PageRoute> {
        let normalized = PathSpec::parse_exact(path).to_string();
        if let Some(page) = self.registry.static_page(&normalized) {
            return Some(PageRoute::Static {
                path: normalized,
                original_spec: page.original_spec.clone(),
                component: page.component.clone(),
                no_ssr: page.no_ssr,
            });
        }

        self.dynamic_order.iter().find_map(|&index| {
            let page = &self.registry.dynamic_pages()[index];
            let params = page.path_spec.match_path(&normalized)?;
            Some(PageRoute::Dynamic {
                path: normalized.clone(),
                path_spec: page.path_spec.clone(),
                params,
                component: page.component.clone(),
                no_ssr: page.no_ssr,
            })
        })
    }

    /// Dynamic pages in match order.
    pub fn dynamic_in_match_order(&self) -> impl Iterator<Item = &DynamicPage> {
        self.dynamic_order
            .iter()
            .map(|&index| &self.registry.dynamic_pages()[index])
    }
}
