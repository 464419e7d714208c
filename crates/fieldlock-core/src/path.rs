//! Field path parsing and navigation.
//!
//! A field path is a dot-separated list of segments locating a node inside a
//! document, e.g. `spec.replicas` or `spec.template.spec.containers.[name=app].image`.
//! A bracketed segment selects the element of a sequence whose own field
//! equals a literal value; dots inside brackets do not split the path.

use crate::error::PathError;
use crate::node::Node;
use std::fmt;
use std::str::FromStr;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Select a key of a mapping.
    Field(String),
    /// Select the first sequence element whose `field` equals `value`.
    Match { field: String, value: String },
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Match { field, value } => write!(f, "[{}={}]", field, value),
        }
    }
}

/// A parsed, non-empty sequence of path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a dot-separated path.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let invalid = |reason: &str| PathError::InvalidSyntax {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        for raw in split_segments(path).ok_or_else(|| invalid("unterminated '['"))? {
            if raw.is_empty() {
                return Err(invalid("empty segment"));
            }
            let segment = match raw.strip_prefix('[') {
                Some(inner) => {
                    let inner = inner
                        .strip_suffix(']')
                        .ok_or_else(|| invalid("text after ']'"))?;
                    let (field, value) = inner
                        .split_once('=')
                        .ok_or_else(|| invalid("list selector must be [field=value]"))?;
                    if field.is_empty() {
                        return Err(invalid("list selector has an empty field name"));
                    }
                    PathSegment::Match {
                        field: field.to_string(),
                        value: value.to_string(),
                    }
                }
                None => PathSegment::Field(raw.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    /// The parsed segments, in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Walk `root` segment by segment and return the node the path points at.
    pub fn lookup<'n>(&self, root: &'n Node) -> Result<&'n Node, PathError> {
        let mut node = root;
        for segment in &self.segments {
            node = self.step(node, segment)?;
        }
        Ok(node)
    }

    fn step<'n>(&self, node: &'n Node, segment: &PathSegment) -> Result<&'n Node, PathError> {
        match segment {
            PathSegment::Field(name) => {
                if !node.is_mapping() {
                    return Err(self.type_walk(segment, node));
                }
                node.get(name).ok_or_else(|| self.not_found(segment))
            }
            PathSegment::Match { field, value } => {
                let Some(items) = node.as_sequence() else {
                    return Err(self.type_walk(segment, node));
                };
                items
                    .iter()
                    .find(|item| {
                        item.get(field)
                            .is_some_and(|v| v.is_scalar() && scalar_text(v) == *value)
                    })
                    .ok_or_else(|| self.not_found(segment))
            }
        }
    }

    fn not_found(&self, segment: &PathSegment) -> PathError {
        PathError::NotFound {
            path: self.to_string(),
            segment: segment.to_string(),
        }
    }

    fn type_walk(&self, segment: &PathSegment, node: &Node) -> PathError {
        PathError::TypeWalk {
            path: self.to_string(),
            segment: segment.to_string(),
            found: node.type_name(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Render a node as comparison text.
///
/// Scalars render as their source text, so `1.10` and `1.1` stay distinct;
/// mappings and sequences render as YAML. Callers are expected to trim the
/// result.
pub fn scalar_text(node: &Node) -> String {
    match node {
        Node::Scalar { text, .. } => text.clone(),
        other => other.to_yaml(),
    }
}

/// Split on dots that are not inside brackets. Returns `None` on an
/// unterminated bracket.
fn split_segments(path: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&path[start..]);
    Some(parts)
}
