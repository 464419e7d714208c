//! Guarded field comparison across plan updates.
//!
//! For every `Update` action, each rule matching the action's group and kind
//! is looked up in both snapshots. Scalars are compared by their source text,
//! trimmed, so `1.10` -> `1.1` or `0x10` -> `16` is a change while a trailing
//! newline is not. Quoting is not part of the text: `'3'` and `3` are equal.

use crate::config::{Rule, RuleIndex};
use crate::error::{CheckError, Snapshot};
use crate::plan::{Action, ActionVerb, Plan};
use fieldlock_core::{Node, scalar_text};
use thiserror::Error;

/// A guarded field that differs between the original and updated object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field {field:?} changed from {before:?} to {after:?}")]
pub struct Violation {
    /// The guarded field path as configured.
    pub field: String,
    /// Trimmed value in the original object.
    pub before: String,
    /// Trimmed value in the updated object.
    pub after: String,
    /// The object the action targets.
    pub target: String,
}

/// How many violations a check collects before failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportMode {
    /// Stop at the first changed field.
    #[default]
    FirstViolation,
    /// Evaluate every rule and report all changed fields together.
    AllViolations,
}

/// Compares guarded fields for every update in a plan.
pub struct MutationChecker<'a> {
    rules: &'a RuleIndex,
    mode: ReportMode,
}

impl<'a> MutationChecker<'a> {
    pub fn new(rules: &'a RuleIndex) -> Self {
        Self {
            rules,
            mode: ReportMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ReportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check every action of `plan`.
    ///
    /// Returns `Ok(())` when no guarded field changed. A rule that cannot be
    /// evaluated (the field is missing from a snapshot) fails the check in
    /// every mode.
    pub fn check(&self, plan: &Plan<'_>) -> Result<(), CheckError> {
        if self.rules.is_empty() {
            tracing::debug!("no guarded fields configured, skipping plan");
            return Ok(());
        }

        let mut violations = Vec::new();
        for action in plan.actions() {
            if action.verb != ActionVerb::Update {
                tracing::trace!(
                    action = action.index,
                    verb = %action.verb,
                    target = %action.target(),
                    "skipping non-update action"
                );
                continue;
            }

            let rules = self.rules.matching(action.api_version, action.kind);
            if rules.is_empty() {
                continue;
            }
            tracing::debug!(
                action = action.index,
                target = %action.target(),
                rules = rules.len(),
                "checking guarded fields"
            );

            let original = action.snapshot(Snapshot::Original)?;
            let updated = action.snapshot(Snapshot::Updated)?;
            for rule in rules {
                let Some(violation) = compare(action, rule, original, updated)? else {
                    continue;
                };
                tracing::debug!(
                    field = %violation.field,
                    target = %violation.target,
                    "guarded field changed"
                );
                match self.mode {
                    ReportMode::FirstViolation => return Err(CheckError::Violation(violation)),
                    ReportMode::AllViolations => violations.push(violation),
                }
            }
        }

        match violations.len() {
            0 => Ok(()),
            1 => Err(CheckError::Violation(violations.remove(0))),
            _ => Err(CheckError::Violations(violations)),
        }
    }
}

fn compare(
    action: &Action<'_>,
    rule: &Rule,
    original: &Node,
    updated: &Node,
) -> Result<Option<Violation>, CheckError> {
    let before = lookup_text(action, rule, original, Snapshot::Original)?;
    let after = lookup_text(action, rule, updated, Snapshot::Updated)?;

    if before == after {
        return Ok(None);
    }
    Ok(Some(Violation {
        field: rule.field.to_string(),
        before,
        after,
        target: action.target(),
    }))
}

fn lookup_text(
    action: &Action<'_>,
    rule: &Rule,
    object: &Node,
    snapshot: Snapshot,
) -> Result<String, CheckError> {
    let node = rule
        .field
        .lookup(object)
        .map_err(|source| CheckError::Navigation {
            action: action.index,
            target: action.target(),
            snapshot,
            source,
        })?;
    Ok(scalar_text(node).trim().to_string())
}
