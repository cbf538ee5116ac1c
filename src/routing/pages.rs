//! Page router: turns registered pages into route items and slot trees.
//!
//! # Responsibilities
//! - Declare one route item per static and dynamic page
//! - Render the page, its layout chain and the root for a concrete path
//! - Compose the route slot: layouts nested root-most first around the page
//!
//! # Design Decisions
//! - Layout and root slots are always static; page slots follow the page
//! - Layouts see only their own pattern path, never route params or query,
//!   so one layout slot renders the same for every path under it
//! - Slot ids: `page:<path>`, `layout:<layout path>`

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::elements::{Elements, HandledRoute, Node, RouteHandler, SlotValue};
use crate::render::{ComponentProps, RenderError};
use crate::routing::path_spec::PathSpec;
use crate::routing::registry::PageRegistry;
use crate::routing::resolver::{PageRoute, RouteResolver};
use crate::routing::route_config::{ItemKind, RouteItem, RouteSource};

pub const PAGE_ID_PREFIX: &str = "page:";
pub const LAYOUT_ID_PREFIX: &str = "layout:";

pub fn page_id(path: &str) -> String {
    format!("{}{}", PAGE_ID_PREFIX, path)
}

pub fn layout_id(path: &str) -> String {
    format!("{}{}", LAYOUT_ID_PREFIX, path)
}

/// Route source and route handler over a configured registry.
#[derive(Debug, Clone)]
pub struct PageRouter {
    resolver: RouteResolver,
}

impl PageRouter {
    pub fn new(registry: Arc<PageRegistry>) -> Self {
        if !registry.is_configured() {
            tracing::warn!("Page router built from a registry that is not marked configured");
        }
        Self {
            resolver: RouteResolver::new(registry),
        }
    }

    pub fn resolver(&self) -> &RouteResolver {
        &self.resolver
    }

    fn item(&self, spec: &PathSpec, layout_spec: &PathSpec, is_static: bool, no_ssr: bool) -> RouteItem {
        let mut elements: BTreeMap<String, bool> = self
            .resolver
            .get_layouts(layout_spec)
            .iter()
            .map(|path| (layout_id(path), true))
            .collect();
        elements.insert(page_id(&spec.to_string()), is_static);

        RouteItem {
            kind: ItemKind::Route,
            path: spec.clone(),
            is_static,
            no_ssr,
            root_static: true,
            route_static: true,
            elements,
        }
    }
}

impl RouteSource for PageRouter {
    fn route_items(&self) -> Vec<RouteItem> {
        let registry = self.resolver.registry();
        let statics = registry
            .static_pages()
            .iter()
            .map(|page| self.item(&page.path_spec, &page.original_spec, true, page.no_ssr));
        let dynamics = self
            .resolver
            .dynamic_in_match_order()
            .map(|page| self.item(&page.path_spec, &page.path_spec, false, page.no_ssr));
        statics.chain(dynamics).collect()
    }
}

impl RouteHandler for PageRouter {
    fn handle_route(&self, path: &str, query: Option<&str>) -> Result<HandledRoute, RenderError> {
        let route = self
            .resolver
            .get_page_route_path(path)
            .ok_or_else(|| RenderError::NotFound(path.to_string()))?;

        let (component, params) = match &route {
            PageRoute::Static { component, .. } => (component, BTreeMap::new()),
            PageRoute::Dynamic {
                component, params, ..
            } => (component, params.clone()),
        };
        let pathname = route.path().to_string();
        let layouts = self.resolver.get_layouts(&route.layout_spec());
        let registry = self.resolver.registry();

        let mut elements = Elements::new();
        for layout_path in &layouts {
            let Some(layout) = registry.layout(layout_path) else {
                continue;
            };
            let props = ComponentProps::for_path(layout_path.as_str());
            elements.insert(layout_id(layout_path), SlotValue::Node(layout.render(&props)?));
        }

        let page_props = ComponentProps {
            path: pathname.clone(),
            params,
            query: query.map(str::to_string),
        };
        let page_slot = page_id(&pathname);
        elements.insert(page_slot.clone(), SlotValue::Node(component.render(&page_props)?));

        let route_element = layouts
            .iter()
            .rev()
            .fold(Node::slot(page_slot), |inner, layout_path| Node::Slot {
                id: layout_id(layout_path),
                children: vec![inner],
            });

        let root_element = match registry.root() {
            Some(root) => root.render(&ComponentProps::for_path("/"))?,
            None => Node::Children,
        };

        Ok(HandledRoute {
            root_element,
            route_element,
            elements,
        })
    }
}
