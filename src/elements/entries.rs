//! Per-request elements map assembly.
//!
//! # Responsibilities
//! - Decode the route path and find its route config
//! - Read the client's skip set from the request headers
//! - Run the route handler once and assemble the elements map
//! - Drop static slots the client already holds
//! - Append the reserved metadata slots
//!
//! # Design Decisions
//! - A missing or malformed skip header means "skip nothing"
//! - Dynamic slots are never skipped, whatever the client claims
//! - Handler failures propagate; no partially built map is returned

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::HeaderMap;
use thiserror::Error;

use crate::elements::encoding::{decode_route_path, EncodingError};
use crate::elements::node::{
    route_slot_id, Elements, Node, RouteMeta, SlotValue, HAS404_ID, IS_STATIC_ID, ROOT_ID,
    ROUTE_ID, ROUTE_SLOT_ID_PREFIX, SKIP_HEADER,
};
use crate::render::RenderError;
use crate::routing::route_config::{RouteConfigError, RouteConfigManager};

/// Errors raised while producing an elements map.
#[derive(Debug, Error)]
pub enum EntriesError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Config(#[from] RouteConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Element ID cannot start with \"{prefix}\": {0}", prefix = ROUTE_SLOT_ID_PREFIX)]
    InvalidElementId(String),
}

/// What a route handler produces for one path.
#[derive(Debug, Clone)]
pub struct HandledRoute {
    pub root_element: Node,
    pub route_element: Node,
    pub elements: Elements,
}

/// Renders the slots of one concrete path.
pub trait RouteHandler: Send + Sync {
    /// `query` is `None` for static routes.
    fn handle_route(&self, path: &str, query: Option<&str>) -> Result<HandledRoute, RenderError>;
}

/// Builds the elements map answering one request.
#[derive(Clone)]
pub struct EntriesManager {
    routes: Arc<RouteConfigManager>,
    handler: Arc<dyn RouteHandler>,
}

impl EntriesManager {
    pub fn new(routes: Arc<RouteConfigManager>, handler: Arc<dyn RouteHandler>) -> Self {
        Self { routes, handler }
    }

    pub fn routes(&self) -> &Arc<RouteConfigManager> {
        &self.routes
    }

    /// Elements map for `encoded_route_path`, or `None` when no route matches.
    pub fn get_entries(
        &self,
        encoded_route_path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<Option<Elements>, EntriesError> {
        let pathname = decode_route_path(encoded_route_path)?;
        let Some(config) = self.routes.get_config_item_by_path(&pathname)? else {
            tracing::debug!(path = %pathname, "No route config for path");
            return Ok(None);
        };
        let has_404 = self.routes.has_404()?;
        let skip = parse_skip_header(headers);

        let handled = self
            .handler
            .handle_route(&pathname, if config.is_static { None } else { query })?;

        if let Some(id) = handled
            .elements
            .keys()
            .find(|id| id.starts_with(ROUTE_SLOT_ID_PREFIX))
        {
            return Err(EntriesError::InvalidElementId(id.clone()));
        }

        let mut entries = handled.elements;
        entries.retain(|id, _| !(skip.contains(id) && config.is_static_id(id)));

        let route_id = route_slot_id(&pathname);
        if !(skip.contains(&route_id) && config.is_static_id(&route_id)) {
            entries.insert(route_id, SlotValue::Node(handled.route_element));
        }
        if !(skip.contains(ROOT_ID) && config.is_static_id(ROOT_ID)) {
            entries.insert(ROOT_ID.to_string(), SlotValue::Node(handled.root_element));
        }

        entries.insert(
            ROUTE_ID.to_string(),
            SlotValue::Route(RouteMeta(pathname.clone(), query.unwrap_or_default().to_string())),
        );
        entries.insert(IS_STATIC_ID.to_string(), SlotValue::Flag(config.is_static));
        if has_404 {
            entries.insert(HAS404_ID.to_string(), SlotValue::Flag(true));
        }

        tracing::debug!(
            path = %pathname,
            slots = entries.len(),
            skipped = skip.len(),
            is_static = config.is_static,
            "Elements map assembled"
        );
        Ok(Some(entries))
    }
}

impl std::fmt::Debug for EntriesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntriesManager")
            .field("routes", &self.routes)
            .finish()
    }
}

/// Slot ids the client claims to hold. Never fails.
pub fn parse_skip_header(headers: &HeaderMap) -> HashSet<String> {
    let Some(value) = headers.get(SKIP_HEADER) else {
        return HashSet::new();
    };
    match value
        .to_str()
        .ok()
        .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
    {
        Some(ids) => ids.into_iter().collect(),
        None => {
            tracing::warn!(header = SKIP_HEADER, "Ignoring malformed skip header");
            HashSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::encoding::encode_route_path;
    use crate::render::{Component, ComponentProps};
    use crate::routing::pages::PageRouter;
    use crate::routing::registry::{PageConfig, PageRegistry, RenderMode};
    use axum::http::HeaderValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager() -> EntriesManager {
        let mut registry = PageRegistry::new();
        registry
            .register_page(PageConfig::new(
                RenderMode::Static,
                "/about",
                Component::constant("about", Node::text("about")),
            ))
            .unwrap();
        registry
            .register_page(PageConfig::new(
                RenderMode::Dynamic,
                "/search",
                Component::new("search", |props: &ComponentProps| {
                    Ok(Node::text(props.get("query").unwrap_or_default()))
                }),
            ))
            .unwrap();
        registry
            .register_layout(
                RenderMode::Static,
                "/",
                Component::constant("layout", Node::element("div").child(Node::Children)),
            )
            .unwrap();
        registry.mark_configured();

        let router = Arc::new(PageRouter::new(Arc::new(registry)));
        EntriesManager::new(Arc::new(RouteConfigManager::new(router.clone())), router)
    }

    fn skip_headers(ids: &[String]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            SKIP_HEADER,
            HeaderValue::from_str(&serde_json::to_string(ids).unwrap()).unwrap(),
        );
        headers
    }

    #[test]
    fn test_full_map_for_static_route() {
        let entries = manager()
            .get_entries(&encode_route_path("/about").unwrap(), None, &HeaderMap::new())
            .unwrap()
            .unwrap();
        let ids: Vec<&str> = entries.keys().map(String::as_str).collect();
        assert_eq!(
            ids,
            vec!["IS_STATIC", "ROUTE", "layout:/", "page:/about", "root", "route:/about"]
        );
        assert_eq!(entries["IS_STATIC"], SlotValue::Flag(true));
    }

    #[test]
    fn test_skip_set_drops_static_payload() {
        let manager = manager();
        let encoded = encode_route_path("/about").unwrap();
        let first = manager.get_entries(&encoded, None, &HeaderMap::new()).unwrap().unwrap();
        let held: Vec<String> = first
            .keys()
            .filter(|id| !matches!(id.as_str(), "ROUTE" | "IS_STATIC" | "HAS404"))
            .cloned()
            .collect();

        let second = manager
            .get_entries(&encoded, None, &skip_headers(&held))
            .unwrap()
            .unwrap();
        let ids: Vec<&str> = second.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["IS_STATIC", "ROUTE"]);
    }

    #[test]
    fn test_dynamic_ids_never_skipped() {
        let manager = manager();
        let held = vec!["page:/search".to_string(), "layout:/".to_string()];
        let entries = manager
            .get_entries(
                &encode_route_path("/search").unwrap(),
                Some("q=rust"),
                &skip_headers(&held),
            )
            .unwrap()
            .unwrap();
        assert_eq!(entries["page:/search"], SlotValue::Node(Node::text("q=rust")));
        assert!(!entries.contains_key("layout:/"));
        assert_eq!(
            entries["ROUTE"],
            SlotValue::Route(RouteMeta("/search".into(), "q=rust".into()))
        );
        assert_eq!(entries["IS_STATIC"], SlotValue::Flag(false));
    }

    #[test]
    fn test_malformed_skip_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(SKIP_HEADER, HeaderValue::from_static("{not json"));
        assert!(parse_skip_header(&headers).is_empty());

        headers.insert(SKIP_HEADER, HeaderValue::from_static("[1, 2]"));
        assert!(parse_skip_header(&headers).is_empty());

        let entries = manager()
            .get_entries(&encode_route_path("/about").unwrap(), None, &headers)
            .unwrap()
            .unwrap();
        assert!(entries.contains_key("page:/about"));
    }

    #[test]
    fn test_unknown_path_is_none() {
        let entries = manager()
            .get_entries(&encode_route_path("/missing").unwrap(), None, &HeaderMap::new())
            .unwrap();
        assert!(entries.is_none());
    }

    #[test]
    fn test_bad_encoding_is_error() {
        assert!(matches!(
            manager().get_entries("/about", None, &HeaderMap::new()),
            Err(EntriesError::Encoding(_))
        ));
    }

    struct FailingHandler {
        calls: AtomicUsize,
    }

    impl RouteHandler for FailingHandler {
        fn handle_route(&self, _: &str, _: Option<&str>) -> Result<HandledRoute, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RenderError::Component("boom".into()))
        }
    }

    #[test]
    fn test_handler_failure_propagates() {
        let base = manager();
        let handler = Arc::new(FailingHandler {
            calls: AtomicUsize::new(0),
        });
        let manager = EntriesManager::new(base.routes().clone(), handler.clone());
        let err = manager
            .get_entries(&encode_route_path("/about").unwrap(), None, &HeaderMap::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }
}
