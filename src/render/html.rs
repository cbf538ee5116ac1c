//! HTML output for elements maps.
//!
//! # Responsibilities
//! - Resolve slot references starting from the `root` slot
//! - Write escaped HTML
//! - Embed the elements map so the client can hydrate without a fetch
//!
//! # Design Decisions
//! - `Children` resolves against the slot that declared it, so layouts
//!   nest without knowing what they wrap
//! - Slot nesting is bounded to catch reference cycles

use std::sync::Arc;

use axum::body::Bytes;

use crate::elements::{route_slot_id, ElementsCodec, Elements, Node, ROOT_ID};
use crate::render::{RenderError, Renderer};

/// Id of the script tag carrying the embedded elements map.
pub const ELEMENTS_SCRIPT_ID: &str = "__ELEMENTS__";

const MAX_SLOT_DEPTH: usize = 64;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Children visible to a `Children` placeholder.
struct Scope<'a> {
    nodes: &'a [Node],
    parent: Option<&'a Scope<'a>>,
}

/// Default renderer: codec bytes on the wire, HTML for documents.
#[derive(Clone)]
pub struct HtmlRenderer {
    codec: Arc<dyn ElementsCodec>,
    head: String,
    client_script: Option<String>,
}

impl HtmlRenderer {
    pub fn new(codec: Arc<dyn ElementsCodec>) -> Self {
        Self {
            codec,
            head: String::new(),
            client_script: None,
        }
    }

    /// Extra markup placed in `<head>` of generated documents.
    pub fn with_head(mut self, head: impl Into<String>) -> Self {
        self.head = head.into();
        self
    }

    pub fn with_client_script(mut self, src: impl Into<String>) -> Self {
        self.client_script = Some(src.into());
        self
    }

    /// Render the root slot wrapping the route slot of `path`.
    pub fn render_route(&self, elements: &Elements, path: &str) -> Result<String, RenderError> {
        render_route(elements, path)
    }

    fn script_tags(&self, elements: &Elements) -> Result<String, RenderError> {
        let payload = self.codec.encode(elements)?;
        let payload = String::from_utf8_lossy(&payload).replace('<', "\\u003c");
        let mut tags = format!(
            "<script type=\"application/json\" id=\"{}\">{}</script>",
            ELEMENTS_SCRIPT_ID, payload
        );
        if let Some(src) = &self.client_script {
            tags.push_str(&format!(
                "<script type=\"module\" src=\"{}\"></script>",
                escape_html(src)
            ));
        }
        Ok(tags)
    }
}

impl Renderer for HtmlRenderer {
    fn content_type(&self) -> &'static str {
        self.codec.content_type()
    }

    fn render_elements(&self, elements: &Elements) -> Result<Bytes, RenderError> {
        Ok(self.codec.encode(elements)?)
    }

    fn render_html(&self, elements: &Elements, path: &str) -> Result<String, RenderError> {
        let body = self.render_route(elements, path)?;
        let scripts = self.script_tags(elements)?;

        if !body.contains("<html") {
            return Ok(format!(
                "<!DOCTYPE html><html><head>{}</head><body>{}{}</body></html>",
                self.head, body, scripts
            ));
        }
        Ok(match body.rfind("</body>") {
            Some(index) => format!("{}{}{}", &body[..index], scripts, &body[index..]),
            None => format!("{}{}", body, scripts),
        })
    }

    fn render_shell(&self) -> String {
        let script = self
            .client_script
            .as_ref()
            .map(|src| format!("<script type=\"module\" src=\"{}\"></script>", escape_html(src)))
            .unwrap_or_default();
        format!(
            "<!DOCTYPE html><html><head>{}</head><body><div id=\"root\"></div>{}</body></html>",
            self.head, script
        )
    }
}

impl std::fmt::Debug for HtmlRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlRenderer")
            .field("content_type", &self.codec.content_type())
            .field("client_script", &self.client_script)
            .finish()
    }
}

/// Render the root slot wrapping the route slot of `path`.
pub fn render_route(elements: &Elements, path: &str) -> Result<String, RenderError> {
    let top = Node::Slot {
        id: ROOT_ID.to_string(),
        children: vec![Node::slot(route_slot_id(path))],
    };
    render_node(elements, &top)
}

/// Render any node, resolving slots through `elements`.
pub fn render_node(elements: &Elements, node: &Node) -> Result<String, RenderError> {
    let mut out = String::new();
    write_node(elements, node, None, 0, &mut out)?;
    Ok(out)
}

/// Read the elements map embedded by [`HtmlRenderer`] back out of a document.
pub fn read_embedded_elements(
    html: &str,
    codec: &dyn ElementsCodec,
) -> Result<Option<Elements>, RenderError> {
    let open = format!("<script type=\"application/json\" id=\"{}\">", ELEMENTS_SCRIPT_ID);
    let Some(start) = html.find(&open).map(|index| index + open.len()) else {
        return Ok(None);
    };
    let Some(len) = html[start..].find("</script>") else {
        return Ok(None);
    };
    Ok(Some(codec.decode(html[start..start + len].as_bytes())?))
}

/// Write `node` as HTML, resolving slots through `elements`.
fn write_node(
    elements: &Elements,
    node: &Node,
    scope: Option<&Scope<'_>>,
    depth: usize,
    out: &mut String,
) -> Result<(), RenderError> {
    match node {
        Node::Text { value } => out.push_str(&escape_html(value)),
        Node::Raw { html } => out.push_str(html),
        Node::Element {
            tag,
            attrs,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return Ok(());
            }
            for child in children {
                write_node(elements, child, scope, depth, out)?;
            }
            out.push_str(&format!("</{}>", tag));
        }
        Node::Fragment { children } => {
            for child in children {
                write_node(elements, child, scope, depth, out)?;
            }
        }
        Node::Slot { id, children } => {
            if depth >= MAX_SLOT_DEPTH {
                return Err(RenderError::TooDeep(MAX_SLOT_DEPTH));
            }
            let target = elements
                .get(id)
                .and_then(|value| value.as_node())
                .ok_or_else(|| RenderError::MissingSlot(id.clone()))?;
            let inner = Scope {
                nodes: children,
                parent: scope,
            };
            write_node(elements, target, Some(&inner), depth + 1, out)?;
        }
        Node::Children => {
            if let Some(scope) = scope {
                for child in scope.nodes {
                    write_node(elements, child, scope.parent, depth, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{JsonCodec, SlotValue};

    fn renderer() -> HtmlRenderer {
        HtmlRenderer::new(Arc::new(JsonCodec)).with_head("<title>t</title>")
    }

    fn layered_elements() -> Elements {
        let mut elements = Elements::new();
        elements.insert(
            "root".into(),
            SlotValue::Node(Node::element("main").child(Node::Children)),
        );
        elements.insert(
            "layout:/".into(),
            SlotValue::Node(Node::element("nav").child(Node::Children)),
        );
        elements.insert("page:/a".into(), SlotValue::Node(Node::text("A & B")));
        elements.insert(
            "route:/a".into(),
            SlotValue::Node(Node::Slot {
                id: "layout:/".into(),
                children: vec![Node::slot("page:/a")],
            }),
        );
        elements
    }

    #[test]
    fn test_nested_slots_resolve() {
        let html = renderer().render_route(&layered_elements(), "/a").unwrap();
        assert_eq!(html, "<main><nav>A &amp; B</nav></main>");
    }

    #[test]
    fn test_document_wraps_and_embeds() {
        let html = renderer().render_html(&layered_elements(), "/a").unwrap();
        assert!(html.starts_with("<!DOCTYPE html><html><head><title>t</title></head><body><main>"));
        assert!(html.contains("id=\"__ELEMENTS__\""));
        assert!(html.ends_with("</script></body></html>"));
    }

    #[test]
    fn test_missing_slot_is_an_error() {
        let mut elements = layered_elements();
        elements.remove("page:/a");
        assert_eq!(
            renderer().render_route(&elements, "/a"),
            Err(RenderError::MissingSlot("page:/a".into()))
        );
    }

    #[test]
    fn test_cycle_is_bounded() {
        let mut elements = Elements::new();
        elements.insert("root".into(), SlotValue::Node(Node::slot("root")));
        assert_eq!(
            renderer().render_route(&elements, "/"),
            Err(RenderError::TooDeep(MAX_SLOT_DEPTH))
        );
    }

    #[test]
    fn test_void_and_attrs() {
        let mut elements = Elements::new();
        elements.insert(
            "root".into(),
            SlotValue::Node(Node::fragment(vec![
                Node::element("img").attr("alt", "\"x\""),
                Node::Children,
            ])),
        );
        elements.insert("route:/".into(), SlotValue::Node(Node::raw("<b>ok</b>")));
        let html = renderer().render_route(&elements, "/").unwrap();
        assert_eq!(html, "<img alt=\"&quot;x&quot;\"><b>ok</b>");
    }

    #[test]
    fn test_embedded_elements_read_back() {
        let mut elements = layered_elements();
        elements.insert("page:/a".into(), SlotValue::Node(Node::text("</script><b>")));
        let html = renderer().render_html(&elements, "/a").unwrap();
        assert!(!html.contains("</script><b>"));
        assert_eq!(
            read_embedded_elements(&html, &JsonCodec).unwrap(),
            Some(elements)
        );
        assert_eq!(read_embedded_elements("<p>none</p>", &JsonCodec).unwrap(), None);
    }

    #[test]
    fn test_shell() {
        let shell = renderer().with_client_script("/client.js").render_shell();
        assert!(shell.contains("<div id=\"root\"></div>"));
        assert!(shell.contains("src=\"/client.js\""));
    }
}
