//! Shared building blocks for fieldlock functions.
//!
//! A function consumes a [`ResourceList`], inspects or transforms its items,
//! and writes a possibly-modified list back out. This crate owns the pieces
//! every function needs regardless of its domain logic:
//!
//! - [`node`]: the YAML tree, which keeps every scalar as written
//! - [`resource`]: documents and the resource list envelope
//! - [`path`]: field path parsing and navigation inside a document
//! - [`result`]: severity-tagged diagnostics attached to the output list

pub mod error;
pub mod node;
pub mod path;
pub mod resource;
pub mod result;

pub use error::{DocumentError, PathError};
pub use node::{Node, ScalarStyle};
pub use path::{FieldPath, PathSegment, scalar_text};
pub use resource::{InputForm, InputStream, Resource, ResourceList};
pub use result::{FunctionResult, ResultItem, Severity};
