//! Path specifications.
//!
//! # Responsibilities
//! - Parse a route path (`/blog/[category]/[id]`) into segments
//! - Serialize segments back to the original path
//! - Compile a spec into a matcher for concrete paths
//! - Extract group values from a concrete path
//!
//! # Design Decisions
//! - Segment-by-segment comparison, no regex (O(n) in segment count)
//! - A match never succeeds partially: segment counts must agree
//! - The empty path and `/` both parse to the root spec (`[]`)

use std::collections::BTreeMap;
use std::fmt;

/// A single segment of a route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Must match byte-for-byte.
    Literal(String),
    /// Matches any single non-empty segment, written `[name]`.
    Group(Option<String>),
}

impl PathSegment {
    pub fn is_group(&self) -> bool {
        matches!(self, PathSegment::Group(_))
    }
}

/// Parsed representation of a route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathSpec {
    segments: Vec<PathSegment>,
}

impl PathSpec {
    /// Parse a path where `[name]` segments are dynamic groups.
    pub fn parse(path: &str) -> Self {
        let segments = split_segments(path)
            .map(|segment| match group_name(segment) {
                Some(name) if name.is_empty() => PathSegment::Group(None),
                Some(name) => PathSegment::Group(Some(name.to_string())),
                None => PathSegment::Literal(segment.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Parse a path treating every segment as a literal, brackets included.
    pub fn parse_exact(path: &str) -> Self {
        let segments = split_segments(path)
            .map(|segment| PathSegment::Literal(segment.to_string()))
            .collect();
        Self { segments }
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of dynamic segments.
    pub fn group_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_group()).count()
    }

    /// True when every segment is a literal.
    pub fn is_literal(&self) -> bool {
        self.group_count() == 0
    }

    /// Names of the groups, in path order. Unnamed groups are skipped.
    pub fn group_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                PathSegment::Group(Some(name)) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The spec made of the first `len` segments.
    pub fn prefix(&self, len: usize) -> PathSpec {
        PathSpec {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// Replace groups with the given values, in order.
    ///
    /// Returns `None` if the number of values differs from the number of groups.
    pub fn fill(&self, values: &[String]) -> Option<PathSpec> {
        if values.len() != self.group_count() {
            return None;
        }
        let mut values = values.iter();
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                PathSegment::Literal(name) => PathSegment::Literal(name.clone()),
                PathSegment::Group(_) => {
                    PathSegment::Literal(values.next().cloned().unwrap_or_default())
                }
            })
            .collect();
        Some(PathSpec { segments })
    }

    /// Compile into a matcher.
    pub fn to_matcher(&self) -> PathMatcher {
        PathMatcher { spec: self.clone() }
    }

    /// Extract `name -> value` for every named group, or `None` on mismatch.
    pub fn match_path(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let concrete: Vec<&str> = split_segments(path).collect();
        if concrete.len() != self.segments.len() {
            return None;
        }

        let mut mapping = BTreeMap::new();
        for (segment, value) in self.segments.iter().zip(concrete) {
            match segment {
                PathSegment::Literal(name) if name != value => return None,
                PathSegment::Literal(_) => {}
                PathSegment::Group(Some(name)) => {
                    mapping.insert(name.clone(), value.to_string());
                }
                PathSegment::Group(None) => {}
            }
        }
        Some(mapping)
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                PathSegment::Literal(name) => write!(f, "/{}", name)?,
                PathSegment::Group(Some(name)) => write!(f, "/[{}]", name)?,
                PathSegment::Group(None) => f.write_str("/[]")?,
            }
        }
        Ok(())
    }
}

/// Compiled form of a [`PathSpec`] used to test concrete paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatcher {
    spec: PathSpec,
}

impl PathMatcher {
    pub fn matches(&self, path: &str) -> bool {
        let mut concrete = split_segments(path);
        for segment in self.spec.segments() {
            match (segment, concrete.next()) {
                (_, None) => return false,
                (PathSegment::Literal(name), Some(value)) if name != value => return false,
                _ => {}
            }
        }
        concrete.next().is_none()
    }

    /// Pattern string in `:name` notation, for logs.
    pub fn pattern(&self) -> String {
        if self.spec.is_empty() {
            return "/".to_string();
        }
        self.spec
            .segments()
            .iter()
            .map(|segment| match segment {
                PathSegment::Literal(name) => format!("/{}", name),
                PathSegment::Group(Some(name)) => format!("/:{}", name),
                PathSegment::Group(None) => "/:_".to_string(),
            })
            .collect()
    }

    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn group_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('[')?.strip_suffix(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for path in ["/", "/about", "/blog/[category]/[id]", "/a/[b]/c"] {
            assert_eq!(PathSpec::parse(path).to_string(), path);
        }
    }

    #[test]
    fn test_empty_path_is_root() {
        let spec = PathSpec::parse("");
        assert!(spec.is_empty());
        assert_eq!(spec.to_string(), "/");
    }

    #[test]
    fn test_match_extracts_groups() {
        let spec = PathSpec::parse("/blog/[category]/[id]");
        let mapping = spec.match_path("/blog/tech/42").unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["category"], "tech");
        assert_eq!(mapping["id"], "42");

        assert!(spec.match_path("/blog/tech").is_none());
        assert!(spec.match_path("/news/tech/42").is_none());
        assert!(spec.match_path("/blog/tech/42/extra").is_none());
    }

    #[test]
    fn test_matcher() {
        let matcher = PathSpec::parse("/users/[id]").to_matcher();
        assert!(matcher.matches("/users/7"));
        assert!(!matcher.matches("/users"));
        assert!(!matcher.matches("/users/7/posts"));
        assert_eq!(matcher.pattern(), "/users/:id");
        assert!(PathSpec::parse("/").to_matcher().matches("/"));
    }

    #[test]
    fn test_exact_keeps_brackets() {
        let spec = PathSpec::parse_exact("/docs/[raw]");
        assert!(spec.is_literal());
        assert!(spec.match_path("/docs/[raw]").is_some());
        assert!(spec.match_path("/docs/other").is_none());
    }

    #[test]
    fn test_fill() {
        let spec = PathSpec::parse("/blog/[category]/[id]");
        let filled = spec.fill(&["tech".into(), "42".into()]).unwrap();
        assert_eq!(filled.to_string(), "/blog/tech/42");
        assert!(spec.fill(&["tech".into()]).is_none());
    }
}
