//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while decoding documents or the resource list envelope.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The input was not valid YAML.
    #[error("failed to parse YAML: {0}")]
    Syntax(String),

    /// The envelope parsed but is not a ResourceList.
    #[error("expected kind ResourceList, found {found}")]
    NotAResourceList { found: String },

    /// A ResourceList field has the wrong shape.
    #[error("invalid ResourceList: {reason}")]
    InvalidEnvelope { reason: String },

    /// An item is not a mapping node.
    #[error("item {index} is not a mapping")]
    InvalidItem { index: usize },

    /// The input contained no documents at all.
    #[error("input is empty")]
    Empty,
}

/// Errors raised while parsing or walking a field path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The textual path could not be parsed.
    #[error("invalid field path {path:?}: {reason}")]
    InvalidSyntax { path: String, reason: String },

    /// A segment did not resolve to any node.
    #[error("field {path:?} not found: no match for segment {segment:?}")]
    NotFound { path: String, segment: String },

    /// A segment was applied to a node that cannot contain it.
    #[error("field {path:?}: cannot apply segment {segment:?} to a {found} node")]
    TypeWalk {
        path: String,
        segment: String,
        found: &'static str,
    },
}
