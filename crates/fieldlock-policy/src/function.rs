//! The function boundary: resource list in, resource list and exit code out.
//!
//! Nothing here touches stdin or stdout; the binary owns the transport.

use crate::checker::{MutationChecker, ReportMode};
use crate::config::{LocalFile, RuleSource, load_rules};
use crate::error::CheckError;
use crate::plan::{Plan, find_plan};
use fieldlock_core::{FunctionResult, ResourceList, ResultItem, Severity};

/// Source identifier attached to every result this function produces.
pub const FUNCTION_NAME: &str = "block-mutation";

/// Per-invocation settings that do not come from the resource list.
pub struct RunOptions {
    /// Fallback configuration used when no function config is supplied.
    pub local_config: Box<dyn RuleSource>,
    pub mode: ReportMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            local_config: Box::new(LocalFile::default()),
            mode: ReportMode::default(),
        }
    }
}

/// The list to write back and the status to exit with.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output: ResourceList,
    pub exit_code: i32,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run the check over `input`.
///
/// Items and function config are passed through untouched. On failure the
/// output carries a single error result and the exit code is 1.
pub fn run(input: ResourceList, options: &RunOptions) -> RunOutcome {
    match check_resource_list(&input, options) {
        Ok(()) => {
            tracing::info!(items = input.items.len(), "no guarded fields changed");
            RunOutcome {
                output: input,
                exit_code: 0,
            }
        }
        Err(err) => {
            if err.is_violation() {
                tracing::warn!(error = %err, "plan changes a guarded field");
            } else {
                tracing::error!(error = %err, "mutation check failed");
            }
            let mut output = input;
            output.results = Some(report(&err));
            RunOutcome {
                output,
                exit_code: 1,
            }
        }
    }
}

/// Load rules, locate the plan and check it.
pub fn check_resource_list(list: &ResourceList, options: &RunOptions) -> Result<(), CheckError> {
    let rules = load_rules(list.function_config.as_ref(), options.local_config.as_ref())?;
    let resource = find_plan(&list.items).ok_or(CheckError::PlanNotFound)?;
    let plan = Plan::from_resource(resource)?;
    MutationChecker::new(&rules).with_mode(options.mode).check(&plan)
}

/// Wrap an error as the run's single diagnostic.
pub fn report(err: &CheckError) -> FunctionResult {
    FunctionResult::new(
        FUNCTION_NAME,
        vec![ResultItem::new(err.to_string(), Severity::Error)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoLocalConfig;

    fn options() -> RunOptions {
        RunOptions {
            local_config: Box::new(NoLocalConfig),
            mode: ReportMode::FirstViolation,
        }
    }

    #[test]
    fn test_missing_plan_is_reported() {
        let input = ResourceList::from_yaml(
            "apiVersion: config.kubernetes.io/v1\nkind: ResourceList\nitems:\n  - apiVersion: v1\n    kind: Service\n",
        )
        .unwrap();
        let outcome = run(input, &options());
        assert_eq!(outcome.exit_code, 1);

        let results = outcome.output.results.unwrap();
        assert_eq!(results.name, "block-mutation");
        assert_eq!(
            results.items,
            vec![ResultItem::new("no plan resource found", Severity::Error)]
        );
    }

    #[test]
    fn test_plan_without_rules_passes() {
        let input = ResourceList::from_yaml(
            "apiVersion: config.kubernetes.io/v1\nkind: ResourceList\nitems:\n  - apiVersion: kpt.dev/v1alpha1\n    kind: Plan\n    spec:\n      actions: []\n",
        )
        .unwrap();
        let outcome = run(input.clone(), &options());
        assert!(outcome.is_success());
        assert!(outcome.output.results.is_none());
        assert_eq!(outcome.output, input);
    }

    #[test]
    fn test_report_is_single_error_item() {
        let result = report(&CheckError::MalformedPlan("spec.actions is not a list".to_string()));
        assert_eq!(result.items.len(), 1);
        assert!(result.has_errors());
        assert_eq!(
            result.to_string(),
            "[error] block-mutation: malformed plan: spec.actions is not a list"
        );
    }
}
