//! UI tree and elements map types.
//!
//! A rendered route is a set of named slots. Each slot holds a [`Node`]
//! tree that may reference other slots by id, so the client can cache
//! slots independently and the server can omit the ones it already holds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Slot holding the root shell.
pub const ROOT_ID: &str = "root";

/// Prefix of the per-route slot id. Caller-supplied ids must not use it.
pub const ROUTE_SLOT_ID_PREFIX: &str = "route:";

/// Metadata slot carrying `[decoded path, query]`.
pub const ROUTE_ID: &str = "ROUTE";

/// Metadata slot flagging a fully static route.
pub const IS_STATIC_ID: &str = "IS_STATIC";

/// Metadata slot present when a not-found route exists.
pub const HAS404_ID: &str = "HAS404";

/// Carries a server function result through the channel. Never rendered.
pub const RETURN_VALUE_ID: &str = "_value";

/// Request header listing the slot ids a client already holds (JSON array).
pub const SKIP_HEADER: &str = "x-pagetree-skip";

/// Full elements map, ordered for deterministic output.
pub type Elements = BTreeMap<String, SlotValue>;

/// Id of the slot composing the layouts and page of `path`.
pub fn route_slot_id(path: &str) -> String {
    format!("{}{}", ROUTE_SLOT_ID_PREFIX, path)
}

/// Value stored under one slot id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotValue {
    Node(Node),
    Flag(bool),
    Route(RouteMeta),
    Value(serde_json::Value),
}

impl SlotValue {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            SlotValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            SlotValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_route(&self) -> Option<&RouteMeta> {
        match self {
            SlotValue::Route(meta) => Some(meta),
            _ => None,
        }
    }
}

impl From<Node> for SlotValue {
    fn from(node: Node) -> Self {
        SlotValue::Node(node)
    }
}

/// Decoded path and raw query of the route an elements map was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMeta(pub String, pub String);

impl RouteMeta {
    pub fn path(&self) -> &str {
        &self.0
    }

    pub fn query(&self) -> &str {
        &self.1
    }
}

/// A declarative UI tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Escaped on output.
    Text { value: String },
    /// Emitted as-is.
    Raw { html: String },
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Node>,
    },
    Fragment { children: Vec<Node> },
    /// Renders the slot `id`; `children` replace any `Children` inside it.
    Slot {
        id: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Node>,
    },
    /// Placeholder for the children of the enclosing slot.
    Children,
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text { value: value.into() }
    }

    pub fn raw(html: impl Into<String>) -> Self {
        Node::Raw { html: html.into() }
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Node::Element {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn fragment(children: Vec<Node>) -> Self {
        Node::Fragment { children }
    }

    pub fn slot(id: impl Into<String>) -> Self {
        Node::Slot {
            id: id.into(),
            children: Vec::new(),
        }
    }

    /// Add an attribute. No-op on anything but `Element`.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Node::Element { attrs, .. } = &mut self {
            attrs.insert(name.into(), value.into());
        }
        self
    }

    /// Append a child. No-op on leaves.
    pub fn child(mut self, node: Node) -> Self {
        match &mut self {
            Node::Element { children, .. }
            | Node::Fragment { children }
            | Node::Slot { children, .. } => children.push(node),
            _ => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let node = Node::element("a")
            .attr("href", "/about")
            .child(Node::text("About"));
        match node {
            Node::Element { tag, attrs, children } => {
                assert_eq!(tag, "a");
                assert_eq!(attrs["href"], "/about");
                assert_eq!(children, vec![Node::text("About")]);
            }
            other => panic!("unexpected node: {:?}", other),
        }
        assert_eq!(Node::text("x").child(Node::Children), Node::text("x"));
    }

    #[test]
    fn test_route_slot_id() {
        assert_eq!(route_slot_id("/blog/1"), "route:/blog/1");
    }

    #[test]
    fn test_slot_value_accessors() {
        assert_eq!(SlotValue::Flag(true).as_flag(), Some(true));
        assert!(SlotValue::Flag(true).as_node().is_none());
        let meta = SlotValue::Route(RouteMeta("/a".into(), "q=1".into()));
        assert_eq!(meta.as_route().unwrap().query(), "q=1");
    }
}
