//! File templates as components.
//!
//! A template is HTML text with two kinds of markers:
//! - `{{name}}` interpolates the escaped prop `name` (`path`, `query`,
//!   or a route param)
//! - `<!--children-->` marks where nested content is rendered

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::elements::Node;
use crate::render::{Component, ComponentProps, RenderError};
use crate::routing::fs::{ComponentLoader, LoadError};

const CHILDREN_MARKER: &str = "<!--children-->";

/// Errors raised while parsing a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed {{{{ marker")]
    UnclosedMarker,

    #[error("empty {{{{}}}} marker")]
    EmptyMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Raw(String),
    Prop(String),
    Children,
}

/// Parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        for (index, chunk) in source.split(CHILDREN_MARKER).enumerate() {
            if index > 0 {
                parts.push(Part::Children);
            }
            parse_props(chunk, &mut parts)?;
        }
        Ok(Self { parts })
    }

    pub fn render(&self, props: &ComponentProps) -> Result<Node, RenderError> {
        let children = self
            .parts
            .iter()
            .map(|part| match part {
                Part::Raw(html) => Ok(Node::raw(html.clone())),
                Part::Prop(name) => props
                    .get(name)
                    .map(Node::text)
                    .ok_or_else(|| RenderError::Component(format!("unknown prop {{{{{}}}}}", name))),
                Part::Children => Ok(Node::Children),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::fragment(children))
    }
}

fn parse_props(mut chunk: &str, parts: &mut Vec<Part>) -> Result<(), TemplateError> {
    while let Some(start) = chunk.find("{{") {
        if start > 0 {
            parts.push(Part::Raw(chunk[..start].to_string()));
        }
        let rest = &chunk[start + 2..];
        let end = rest.find("}}").ok_or(TemplateError::UnclosedMarker)?;
        let name = rest[..end].trim();
        if name.is_empty() {
            return Err(TemplateError::EmptyMarker);
        }
        parts.push(Part::Prop(name.to_string()));
        chunk = &rest[end + 2..];
    }
    if !chunk.is_empty() {
        parts.push(Part::Raw(chunk.to_string()));
    }
    Ok(())
}

/// Loads components from template files under a directory.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    root: PathBuf,
}

impl TemplateLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ComponentLoader for TemplateLoader {
    fn load(&self, reference: &str) -> Result<Component, LoadError> {
        let path = self.root.join(reference);
        let source = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let template = Arc::new(Template::parse(&source).map_err(|source| LoadError::Template {
            reference: reference.to_string(),
            source,
        })?);
        Ok(Component::new(reference.to_string(), move |props| template.render(props)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_parse_and_render() {
        let template = Template::parse("<h1>{{ slug }}</h1><!--children--><p>{{path}}</p>").unwrap();
        let props = ComponentProps {
            path: "/blog/x".into(),
            params: BTreeMap::from([("slug".to_string(), "<x>".to_string())]),
            query: None,
        };
        assert_eq!(
            template.render(&props).unwrap(),
            Node::fragment(vec![
                Node::raw("<h1>"),
                Node::text("<x>"),
                Node::raw("</h1>"),
                Node::Children,
                Node::raw("<p>"),
                Node::text("/blog/x"),
                Node::raw("</p>"),
            ])
        );
    }

    #[test]
    fn test_unknown_prop_fails_render() {
        let template = Template::parse("{{nope}}").unwrap();
        assert!(matches!(
            template.render(&ComponentProps::default()),
            Err(RenderError::Component(_))
        ));
    }

    #[test]
    fn test_malformed_markers() {
        assert_eq!(
            Template::parse("<p>{{oops</p>").unwrap_err(),
            TemplateError::UnclosedMarker
        );
        assert_eq!(Template::parse("<p>{{ }}</p>").unwrap_err(), TemplateError::EmptyMarker);
    }

    #[test]
    fn test_loader_reports_template_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.html"), "<p>{{oops</p>").unwrap();
        let err = TemplateLoader::new(dir.path()).load("bad.html").unwrap_err();
        assert!(matches!(
            &err,
            LoadError::Template { reference, source: TemplateError::UnclosedMarker } if reference == "bad.html"
        ));
        assert_eq!(err.to_string(), "Invalid template bad.html: unclosed {{ marker");
    }

    #[test]
    fn test_loader_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("about.html"), "<p>{{path}}</p>").unwrap();
        let loader = TemplateLoader::new(dir.path());

        let component = loader.load("about.html").unwrap();
        assert_eq!(component.name(), "about.html");
        let node = component.render(&ComponentProps::for_path("/about")).unwrap();
        assert_eq!(
            node,
            Node::fragment(vec![Node::raw("<p>"), Node::text("/about"), Node::raw("</p>")])
        );
        assert!(matches!(loader.load("missing.html"), Err(LoadError::Io { .. })));
    }
}
