//! Error types for mutation policy enforcement.
//!
//! Every variant is fatal to the run. [`CheckError::Violation`] is the only
//! one that means the plan itself broke policy; the rest mean the check could
//! not be evaluated.

use crate::checker::Violation;
use fieldlock_core::PathError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving the guarded field configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The local configuration file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not of the expected shape.
    #[error("malformed function config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A resource field entry carries an unusable field path.
    #[error("resourceFields[{index}]: {source}")]
    InvalidField {
        index: usize,
        #[source]
        source: PathError,
    },
}

/// Which side of an update a lookup ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    Original,
    Updated,
}

impl Snapshot {
    /// Key of the snapshot inside a plan action.
    pub fn key(self) -> &'static str {
        match self {
            Snapshot::Original => "original",
            Snapshot::Updated => "updated",
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Errors that end a check run.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The input carried no change plan.
    #[error("no plan resource found")]
    PlanNotFound,

    /// The plan (or one of its actions) is missing required structure.
    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    /// A guarded field could not be located in one of the snapshots.
    #[error("action {action} ({target}), {snapshot} snapshot: {source}")]
    Navigation {
        action: usize,
        target: String,
        snapshot: Snapshot,
        #[source]
        source: PathError,
    },

    /// A guarded field differs between the snapshots.
    #[error(transparent)]
    Violation(Violation),

    /// Several guarded fields differ; only produced when reporting all violations.
    #[error("{} guarded fields changed: {}", .0.len(), join_violations(.0))]
    Violations(Vec<Violation>),
}

impl CheckError {
    /// True when the plan broke policy, as opposed to the check failing to run.
    pub fn is_violation(&self) -> bool {
        matches!(self, CheckError::Violation(_) | CheckError::Violations(_))
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
