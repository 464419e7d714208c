//! Change plan lookup.
//!
//! The plan is produced by `kpt live plan` and looks like:
//!
//! ```yaml
//! apiVersion: kpt.dev/v1alpha1
//! kind: Plan
//! spec:
//!   actions:
//!     - action: Update
//!       apiVersion: apps/v1
//!       kind: Deployment
//!       name: web
//!       original: {...}
//!       updated: {...}
//! ```

use crate::error::{CheckError, Snapshot};
use fieldlock_core::{FieldPath, Node, Resource};
use std::fmt;

pub const PLAN_API_VERSION: &str = "kpt.dev/v1alpha1";
pub const PLAN_KIND: &str = "Plan";

/// Return the first plan document in `items`.
pub fn find_plan(items: &[Resource]) -> Option<&Resource> {
    items
        .iter()
        .find(|item| item.api_version() == Some(PLAN_API_VERSION) && item.kind() == Some(PLAN_KIND))
}

/// What an action would do to its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionVerb {
    Create,
    Update,
    Delete,
    Skip,
    Other(String),
}

impl ActionVerb {
    pub fn parse(verb: &str) -> Self {
        match verb {
            "Create" => ActionVerb::Create,
            "Update" => ActionVerb::Update,
            "Delete" => ActionVerb::Delete,
            "Skip" => ActionVerb::Skip,
            other => ActionVerb::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ActionVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionVerb::Create => write!(f, "Create"),
            ActionVerb::Update => write!(f, "Update"),
            ActionVerb::Delete => write!(f, "Delete"),
            ActionVerb::Skip => write!(f, "Skip"),
            ActionVerb::Other(verb) => write!(f, "{}", verb),
        }
    }
}

/// One entry of `spec.actions`, borrowed from the plan document.
#[derive(Debug, Clone)]
pub struct Action<'a> {
    /// Position in `spec.actions`.
    pub index: usize,
    pub api_version: &'a str,
    pub kind: &'a str,
    pub name: Option<&'a str>,
    pub verb: ActionVerb,
    node: &'a Node,
}

impl<'a> Action<'a> {
    fn from_node(index: usize, node: &'a Node) -> Result<Self, CheckError> {
        if !node.is_mapping() {
            return Err(CheckError::MalformedPlan(format!(
                "action {} is not a mapping",
                index
            )));
        }
        let required = |key: &str| {
            node.get(key).and_then(Node::as_str).ok_or_else(|| {
                CheckError::MalformedPlan(format!("action {} is missing {}", index, key))
            })
        };

        Ok(Self {
            index,
            api_version: required("apiVersion")?,
            kind: required("kind")?,
            verb: ActionVerb::parse(required("action")?),
            name: node.get("name").and_then(Node::as_str),
            node,
        })
    }

    /// The `original` or `updated` object carried by the action.
    pub fn snapshot(&self, snapshot: Snapshot) -> Result<&'a Node, CheckError> {
        match self.node.get(snapshot.key()) {
            Some(object) if object.is_mapping() => Ok(object),
            _ => Err(CheckError::MalformedPlan(format!(
                "{} action {} ({}) has no {} object",
                self.verb,
                self.index,
                self.target(),
                snapshot
            ))),
        }
    }

    /// `apiVersion/kind name` of the object the action targets.
    pub fn target(&self) -> String {
        match self.name {
            Some(name) => format!("{}/{} {}", self.api_version, self.kind, name),
            None => format!("{}/{}", self.api_version, self.kind),
        }
    }
}

/// A located change plan with its actions in order.
#[derive(Debug, Clone)]
pub struct Plan<'a> {
    resource: &'a Resource,
    actions: Vec<Action<'a>>,
}

impl<'a> Plan<'a> {
    /// Read the action list out of a plan document.
    ///
    /// A plan without `spec.actions` is malformed; an empty (or null) list
    /// is a valid plan with nothing to do.
    pub fn from_resource(resource: &'a Resource) -> Result<Self, CheckError> {
        let path = FieldPath::parse("spec.actions")
            .map_err(|e| CheckError::MalformedPlan(e.to_string()))?;
        let list = path
            .lookup(resource.node())
            .map_err(|err| CheckError::MalformedPlan(err.to_string()))?;
        let actions = match list.as_sequence() {
            Some(items) => items
                .iter()
                .enumerate()
                .map(|(index, node)| Action::from_node(index, node))
                .collect::<Result<Vec<_>, _>>()?,
            None if list.is_null() => Vec::new(),
            None => {
                return Err(CheckError::MalformedPlan(
                    "spec.actions is not a list".to_string(),
                ));
            }
        };

        tracing::debug!(plan = %resource.describe(), actions = actions.len(), "located plan");
        Ok(Self { resource, actions })
    }

    pub fn resource(&self) -> &'a Resource {
        self.resource
    }

    pub fn actions(&self) -> &[Action<'a>] {
        &self.actions
    }
}
