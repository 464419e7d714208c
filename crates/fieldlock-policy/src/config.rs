//! Guarded field configuration.
//!
//! Rules come from the first of these that is present:
//!
//! 1. the function config supplied with the invocation
//! 2. a local file at a conventional path ([`LOCAL_CONFIG_PATH`])
//! 3. nothing, which yields an empty rule set
//!
//! A `v1/ConfigMap` function config without any `data` entries counts as
//! "not supplied". Malformed input at any step is an error, never a reason
//! to fall through.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: fn.kpt.dev/v1alpha1
//! kind: BlockMutation
//! metadata:
//!   name: guarded-fields
//! resourceFields:
//!   - group: apps/v1
//!     kind: Deployment
//!     field: spec.replicas
//! ```
//!
//! The ConfigMap form carries the same list as an embedded YAML string under
//! `data.resourceFields`.

use crate::error::ConfigError;
use fieldlock_core::{FieldPath, Node, Resource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Conventional location of the local fallback configuration.
pub const LOCAL_CONFIG_PATH: &str = "/localconfig/fn-config.yaml";

/// The configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationConfig {
    /// Fields that must not change, in evaluation order.
    #[serde(default)]
    pub resource_fields: Vec<ResourceField>,
}

/// One guarded field as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceField {
    /// apiVersion of the guarded resource, e.g. `apps/v1`.
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub kind: String,
    /// Dot-separated path inside the resource.
    #[serde(default)]
    pub field: String,
}

impl MutationConfig {
    /// Parse the dedicated configuration shape from YAML.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Decode a function config document of either accepted shape.
    pub fn from_resource(resource: &Resource) -> Result<Self, ConfigError> {
        if !is_config_map(resource) {
            return resource.node().deserialize().map_err(ConfigError::from);
        }

        let Some(fields) = resource.data().and_then(|data| data.get("resourceFields")) else {
            return Ok(Self::default());
        };
        let resource_fields = match fields {
            Node::Scalar { text, .. } if fields.is_null() || text.trim().is_empty() => Vec::new(),
            Node::Scalar { text, .. } => serde_yaml::from_str(text)?,
            other => other.deserialize()?,
        };
        Ok(Self { resource_fields })
    }

    /// Validate every entry and turn the configuration into rules.
    pub fn into_rules(self) -> Result<Vec<Rule>, ConfigError> {
        self.resource_fields
            .into_iter()
            .enumerate()
            .map(|(index, rf)| {
                let field = FieldPath::parse(&rf.field)
                    .map_err(|source| ConfigError::InvalidField { index, source })?;
                Ok(Rule {
                    group: rf.group,
                    kind: rf.kind,
                    field,
                })
            })
            .collect()
    }
}

/// A parsed guarded field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub group: String,
    pub kind: String,
    pub field: FieldPath,
}

/// Rules grouped by `(group, kind)`, keeping configuration order within a group.
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    by_group: BTreeMap<String, BTreeMap<String, Vec<Rule>>>,
    len: usize,
}

impl RuleIndex {
    pub fn new(rules: Vec<Rule>) -> Self {
        let len = rules.len();
        let mut by_group: BTreeMap<String, BTreeMap<String, Vec<Rule>>> = BTreeMap::new();
        for rule in rules {
            by_group
                .entry(rule.group.clone())
                .or_default()
                .entry(rule.kind.clone())
                .or_default()
                .push(rule);
        }
        Self { by_group, len }
    }

    /// Rules guarding resources of exactly this group and kind.
    pub fn matching(&self, group: &str, kind: &str) -> &[Rule] {
        self.by_group
            .get(group)
            .and_then(|kinds| kinds.get(kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Where fallback configuration is read from when none is supplied inline.
pub trait RuleSource {
    /// Return the raw configuration, or `None` when the source does not exist.
    fn read(&self) -> Result<Option<String>, ConfigError>;

    /// Human-readable location for log lines.
    fn describe(&self) -> String;
}

/// Fallback configuration stored on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for LocalFile {
    fn default() -> Self {
        Self::new(LOCAL_CONFIG_PATH)
    }
}

impl RuleSource for LocalFile {
    fn read(&self) -> Result<Option<String>, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A source that never has anything; disables the local fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalConfig;

impl RuleSource for NoLocalConfig {
    fn read(&self) -> Result<Option<String>, ConfigError> {
        Ok(None)
    }

    fn describe(&self) -> String {
        "<disabled>".to_string()
    }
}

/// Resolve the guarded fields for one invocation.
pub fn load_rules(
    function_config: Option<&Resource>,
    local: &dyn RuleSource,
) -> Result<RuleIndex, ConfigError> {
    let config = match function_config {
        Some(resource) if !is_empty_function_config(resource) => {
            tracing::debug!(config = %resource.describe(), "using supplied function config");
            MutationConfig::from_resource(resource)?
        }
        _ => match local.read()? {
            Some(content) => {
                tracing::debug!(path = %local.describe(), "using local function config");
                MutationConfig::from_yaml(&content)?
            }
            None => {
                tracing::debug!(path = %local.describe(), "no function config found, nothing to guard");
                MutationConfig::default()
            }
        },
    };

    let index = RuleIndex::new(config.into_rules()?);
    tracing::debug!(rules = index.len(), "loaded guarded fields");
    Ok(index)
}

fn is_config_map(resource: &Resource) -> bool {
    resource.api_version() == Some("v1") && resource.kind() == Some("ConfigMap")
}

/// Absent config, or a ConfigMap without data entries.
fn is_empty_function_config(resource: &Resource) -> bool {
    if resource.is_empty() {
        return true;
    }
    is_config_map(resource) && resource.data().is_none_or(|data| data.is_empty())
}
