//! Mutation policy enforcement for kpt change plans.
//!
//! A change plan lists the updates a pipeline is about to apply, each with the
//! live object (`original`) and the object that would replace it (`updated`).
//! This crate loads a set of guarded fields and fails the run when any update
//! would change one of them.
//!
//! The pieces, leaves first:
//!
//! 1. [`config`] - loads guarded fields and indexes them by group and kind
//! 2. [`plan`] - finds the plan document and exposes its actions
//! 3. [`checker`] - compares guarded fields across each update
//! 4. [`function`] - turns the outcome into a result block and exit code

pub mod checker;
pub mod config;
pub mod error;
pub mod function;
pub mod plan;

pub use checker::{MutationChecker, ReportMode, Violation};
pub use config::{
    LOCAL_CONFIG_PATH, LocalFile, MutationConfig, NoLocalConfig, ResourceField, Rule, RuleIndex,
    RuleSource, load_rules,
};
pub use error::{CheckError, ConfigError, Snapshot};
pub use function::{FUNCTION_NAME, RunOptions, RunOutcome, check_resource_list, report, run};
pub use plan::{Action, ActionVerb, PLAN_API_VERSION, PLAN_KIND, Plan, find_plan};
