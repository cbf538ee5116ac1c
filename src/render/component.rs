//! Components: functions from props to a UI tree.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::elements::Node;
use crate::render::RenderError;

/// Inputs available to a component while rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentProps {
    /// Concrete path being rendered (the layout's own path for layouts).
    pub path: String,
    /// Values of the route's dynamic segments.
    pub params: BTreeMap<String, String>,
    /// Raw query string. Always `None` for static routes.
    pub query: Option<String>,
}

impl ComponentProps {
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Look up a prop by name: `path`, `query`, or a route param.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "path" => Some(self.path.as_str()),
            "query" => Some(self.query.as_deref().unwrap_or("")),
            _ => self.params.get(name).map(String::as_str),
        }
    }
}

type RenderFn = dyn Fn(&ComponentProps) -> Result<Node, RenderError> + Send + Sync;

/// A cheaply cloneable render function.
#[derive(Clone)]
pub struct Component {
    name: Arc<str>,
    render: Arc<RenderFn>,
}

impl Component {
    pub fn new<F>(name: impl Into<Arc<str>>, render: F) -> Self
    where
        F: Fn(&ComponentProps) -> Result<Node, RenderError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            render: Arc::new(render),
        }
    }

    /// A component that always renders the same tree.
    pub fn constant(name: impl Into<Arc<str>>, node: Node) -> Self {
        Self::new(name, move |_| Ok(node.clone()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, props: &ComponentProps) -> Result<Node, RenderError> {
        (self.render)(props)
    }

    /// Bake `params` into every render, overriding request-supplied values.
    pub fn with_params(&self, params: BTreeMap<String, String>) -> Component {
        let inner = self.render.clone();
        Component {
            name: self.name.clone(),
            render: Arc::new(move |props: &ComponentProps| {
                let mut props = props.clone();
                props.params.extend(params.clone());
                inner(&props)
            }),
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component").field("name", &self.name).finish()
    }
}
