//! Diagnostics attached to the output resource list.

use crate::node::Node;
use std::fmt;

/// Severity level of a result item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational message.
    Info,
    /// Something looks off but the run may still pass.
    Warning,
    /// The run failed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    pub message: String,
    pub severity: Severity,
}

impl ResultItem {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// The result block a function writes under `results`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionResult {
    /// Fixed identifier of the function that produced the items.
    pub name: String,
    pub items: Vec<ResultItem>,
}

impl FunctionResult {
    pub fn new(name: impl Into<String>, items: Vec<ResultItem>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    /// The `results` block as written into the output list.
    pub fn to_node(&self) -> Node {
        let items = self
            .items
            .iter()
            .map(|item| {
                Node::mapping([
                    ("message", Node::string(&item.message)),
                    ("severity", Node::string(item.severity.to_string())),
                ])
            })
            .collect();
        Node::mapping([
            ("name", Node::string(&self.name)),
            ("items", Node::sequence(items)),
        ])
    }

    /// Whether any item is an error.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|item| item.severity == Severity::Error)
    }
}

impl fmt::Display for FunctionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{}] {}: {}", item.severity, self.name, item.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_block_layout() {
        let result = FunctionResult::new(
            "block-mutation",
            vec![ResultItem::new(
                r#"field "spec.replicas" changed from "3" to "5""#,
                Severity::Error,
            )],
        );
        let yaml = result.to_node().to_yaml();
        assert_eq!(
            yaml,
            "name: block-mutation\nitems:\n  - message: \"field \\\"spec.replicas\\\" changed from \\\"3\\\" to \\\"5\\\"\"\n    severity: error\n"
        );
        let reparsed = Node::parse(&yaml).unwrap();
        let message = reparsed
            .get("items")
            .and_then(Node::as_sequence)
            .and_then(|items| items[0].get("message"))
            .and_then(Node::as_str);
        assert_eq!(message, Some(result.items[0].message.as_str()));
    }
}
