//! Normalized route configuration.
//!
//! # Responsibilities
//! - Convert a route source's declarative items into cached configs
//! - Validate item kinds and element ids
//! - Answer "which route serves this path"
//!
//! # Design Decisions
//! - Computed once on first access, then immutable for the process
//!   (or build) lifetime; there is no partial invalidation
//! - First matching item wins, in source order
//! - The not-found route is simply the route at `/404`

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::elements::{ROOT_ID, ROUTE_SLOT_ID_PREFIX};
use crate::routing::path_spec::{PathMatcher, PathSpec};

/// Path of the not-found route.
pub const NOT_FOUND_PATH: &str = "/404";

/// Errors raised while building the route configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteConfigError {
    #[error("Unknown config type: {0}")]
    UnknownConfigType(String),

    #[error("Element ID cannot start with \"{prefix}\": {id}")]
    InvalidElementId { id: String, prefix: &'static str },
}

/// Kind of a declared item. Only `Route` is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Route,
    Api,
}

impl ItemKind {
    fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Route => "route",
            ItemKind::Api => "api",
        }
    }
}

/// Declared route, as produced by a [`RouteSource`].
#[derive(Debug, Clone)]
pub struct RouteItem {
    pub kind: ItemKind,
    pub path: PathSpec,
    pub is_static: bool,
    pub no_ssr: bool,
    pub root_static: bool,
    pub route_static: bool,
    /// Element id -> whether the element is static.
    pub elements: BTreeMap<String, bool>,
}

/// Something that can declare routes.
pub trait RouteSource: Send + Sync {
    fn route_items(&self) -> Vec<RouteItem>;
}

/// Normalized, cached form of one route.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub path_spec: PathSpec,
    pub matcher: PathMatcher,
    /// Set when the path has no dynamic segments.
    pub pathname: Option<String>,
    pub is_static: bool,
    pub no_ssr: bool,
    pub root_static: bool,
    pub route_static: bool,
    pub static_ids: HashSet<String>,
    pub has_404: bool,
}

impl RouteConfig {
    /// Whether the element `id` never changes for this route.
    pub fn is_static_id(&self, id: &str) -> bool {
        if id == ROOT_ID {
            self.root_static
        } else if id.starts_with(ROUTE_SLOT_ID_PREFIX) {
            self.route_static
        } else {
            self.static_ids.contains(id)
        }
    }

    /// Static routes with a literal path are materialized at build time.
    pub fn is_buildable(&self) -> bool {
        self.is_static && self.pathname.is_some()
    }

    pub fn is_not_found(&self) -> bool {
        self.pathname.as_deref() == Some(NOT_FOUND_PATH)
    }
}

/// Lazily computed route table.
pub struct RouteConfigManager {
    source: Arc<dyn RouteSource>,
    cache: OnceLock<Result<Vec<RouteConfig>, RouteConfigError>>,
}

impl RouteConfigManager {
    pub fn new(source: Arc<dyn RouteSource>) -> Self {
        Self {
            source,
            cache: OnceLock::new(),
        }
    }

    /// All route configs, computed on first call.
    pub fn configs(&self) -> Result<&[RouteConfig], RouteConfigError> {
        self.cache
            .get_or_init(|| build_configs(self.source.route_items()))
            .as_deref()
            .map_err(Clone::clone)
    }

    /// First route whose pattern matches `path`.
    pub fn get_config_item_by_path(
        &self,
        path: &str,
    ) -> Result<Option<&RouteConfig>, RouteConfigError> {
        Ok(self
            .configs()?
            .iter()
            .find(|config| config.matcher.matches(path)))
    }

    pub fn has_404(&self) -> Result<bool, RouteConfigError> {
        Ok(self.configs()?.first().is_some_and(|config| config.has_404))
    }
}

impl std::fmt::Debug for RouteConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteConfigManager")
            .field("computed", &self.cache.get().is_some())
            .finish()
    }
}

fn build_configs(items: Vec<RouteItem>) -> Result<Vec<RouteConfig>, RouteConfigError> {
    let has_404 = items
        .iter()
        .any(|item| item.kind == ItemKind::Route && item.path.to_string() == NOT_FOUND_PATH);

    let mut configs = Vec::with_capacity(items.len());
    for item in items {
        if item.kind != ItemKind::Route {
            return Err(RouteConfigError::UnknownConfigType(item.kind.as_str().to_string()));
        }
        if let Some(id) = item
            .elements
            .keys()
            .find(|id| id.starts_with(ROUTE_SLOT_ID_PREFIX))
        {
            return Err(RouteConfigError::InvalidElementId {
                id: id.clone(),
                prefix: ROUTE_SLOT_ID_PREFIX,
            });
        }

        configs.push(RouteConfig {
            matcher: item.path.to_matcher(),
            pathname: item.path.is_literal().then(|| item.path.to_string()),
            path_spec: item.path,
            is_static: item.is_static,
            no_ssr: item.no_ssr,
            root_static: item.root_static,
            route_static: item.route_static,
            static_ids: item
                .elements
                .into_iter()
                .filter(|(_, is_static)| *is_static)
                .map(|(id, _)| id)
                .collect(),
            has_404,
        });
    }

    tracing::debug!(routes = configs.len(), has_404, "Route configuration computed");
    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        items: Vec<RouteItem>,
        calls: AtomicUsize,
    }

    impl RouteSource for CountingSource {
        fn route_items(&self) -> Vec<RouteItem> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.items.clone()
        }
    }

    fn item(path: &str, is_static: bool) -> RouteItem {
        RouteItem {
            kind: ItemKind::Route,
            path: PathSpec::parse(path),
            is_static,
            no_ssr: false,
            root_static: true,
            route_static: true,
            elements: BTreeMap::from([(format!("page:{}", path), is_static)]),
        }
    }

    #[test]
    fn test_lookup_and_memoization() {
        let source = Arc::new(CountingSource {
            items: vec![item("/", true), item("/blog/[id]", false), item("/404", true)],
            calls: AtomicUsize::new(0),
        });
        let manager = RouteConfigManager::new(source.clone());

        let config = manager.get_config_item_by_path("/blog/7").unwrap().unwrap();
        assert!(!config.is_static);
        assert!(config.pathname.is_none());
        assert!(config.has_404);

        let home = manager.get_config_item_by_path("/").unwrap().unwrap();
        assert!(home.is_buildable());
        assert!(home.is_static_id("page:/"));
        assert!(home.is_static_id("root"));
        assert!(home.is_static_id("route:/"));
        assert!(!home.is_static_id("page:/other"));

        assert!(manager.get_config_item_by_path("/nope/x/y").unwrap().is_none());
        assert!(manager.has_404().unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut api = item("/api", false);
        api.kind = ItemKind::Api;
        let manager = RouteConfigManager::new(Arc::new(CountingSource {
            items: vec![api],
            calls: AtomicUsize::new(0),
        }));
        assert_eq!(
            manager.configs().unwrap_err(),
            RouteConfigError::UnknownConfigType("api".into())
        );
    }

    #[test]
    fn test_reserved_element_id_rejected() {
        let mut bad = item("/", true);
        bad.elements.insert("route:/x".into(), true);
        let manager = RouteConfigManager::new(Arc::new(CountingSource {
            items: vec![bad],
            calls: AtomicUsize::new(0),
        }));
        assert!(matches!(
            manager.get_config_item_by_path("/"),
            Err(RouteConfigError::InvalidElementId { .. })
        ));
    }
}
