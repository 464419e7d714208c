//! `block-mutation` kpt function.
//!
//! Reads a ResourceList from stdin, fails if the kpt plan it carries changes
//! any guarded field, and writes the list (plus a result on failure) to
//! stdout. Logs go to stderr; set `RUST_LOG` to raise verbosity.
//!
//! Standalone mode: pass a function config file as the first argument and
//! pipe either a ResourceList or plain YAML documents on stdin.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fieldlock_core::{InputForm, InputStream, Resource, ResourceList};
use fieldlock_policy::{LOCAL_CONFIG_PATH, LocalFile, ReportMode, RunOptions, run};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "block-mutation",
    version,
    about = "Fail a kpt plan that changes guarded resource fields"
)]
struct Cli {
    /// Function config file. Enables standalone mode, where stdin may also be
    /// a plain stream of YAML documents.
    function_config: Option<PathBuf>,

    /// Fallback configuration read when no function config is supplied.
    #[arg(long, env = "BLOCK_MUTATION_LOCAL_CONFIG", default_value = LOCAL_CONFIG_PATH)]
    local_config: PathBuf,

    /// Stop at the first changed field, or report all of them.
    #[arg(long, value_enum, default_value_t = Report::First)]
    report: Report,

    /// Read input from a file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write output to a file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Report {
    First,
    All,
}

impl From<Report> for ReportMode {
    fn from(report: Report) -> Self {
        match report {
            Report::First => ReportMode::FirstViolation,
            Report::All => ReportMode::AllViolations,
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let code = execute(&cli).inspect_err(|err| {
        tracing::error!(error = %format!("{err:#}"), "block-mutation could not run");
    })?;
    Ok(ExitCode::from(code))
}

/// Read, check and write one resource list. Returns the process exit code.
fn execute(cli: &Cli) -> Result<u8> {
    let content = read_input(cli.input.as_deref())?;
    let mut input = parse_input(&content, cli.function_config.is_some())?;
    tracing::debug!(
        form = ?input.form,
        items = input.list.items.len(),
        "read input"
    );

    if let Some(path) = &cli.function_config {
        let config = fs::read_to_string(path)
            .with_context(|| format!("failed to read function config {}", path.display()))?;
        let config = Resource::from_yaml(&config)
            .with_context(|| format!("failed to parse function config {}", path.display()))?;
        tracing::debug!(path = %path.display(), config = %config.describe(), "loaded function config");
        input.list.function_config = Some(config);
    }

    let options = RunOptions {
        local_config: Box::new(LocalFile::new(&cli.local_config)),
        mode: cli.report.into(),
    };
    let outcome = run(input.list.clone(), &options);

    if input.form == InputForm::Stream {
        if let Some(results) = &outcome.output.results {
            eprintln!("{}", results);
        }
    }

    let rendered = input.render(&outcome.output);
    write_output(cli.output.as_deref(), &rendered)?;

    let code = if outcome.is_success() { 0 } else { 1 };
    tracing::info!(exit_code = code, bytes = rendered.len(), "wrote output");
    Ok(code)
}

fn parse_input(content: &str, standalone: bool) -> Result<InputStream> {
    if standalone {
        return InputStream::parse(content).context("failed to parse input");
    }
    let list = ResourceList::from_yaml(content).context("failed to parse ResourceList input")?;
    Ok(InputStream {
        list,
        form: InputForm::ResourceList,
    })
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input {}", path.display())),
        None => io::read_to_string(io::stdin()).context("failed to read stdin"),
    }
}

fn write_output(path: Option<&Path>, rendered: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write output {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .context("failed to write stdout")?;
            stdout.flush().context("failed to write stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN_LIST: &str = r#"apiVersion: config.kubernetes.io/v1
kind: ResourceList
items:
  - apiVersion: kpt.dev/v1alpha1
    kind: Plan
    metadata:
      name: plan
    spec:
      actions:
        - action: Update
          apiVersion: v1
          kind: Service
          name: web
          original:
            spec:
              type: ClusterIP
          updated:
            spec:
              type: LoadBalancer
"#;

    const CONFIG: &str = "apiVersion: fn.kpt.dev/v1alpha1\nkind: BlockMutation\nresourceFields:\n  - group: v1\n    kind: Service\n    field: spec.type\n";

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("block-mutation").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_arguments() {
        let cli = cli(&[]);
        assert!(cli.function_config.is_none());
        assert_eq!(cli.report, Report::First);
        assert_eq!(ReportMode::from(cli.report), ReportMode::FirstViolation);
    }

    #[test]
    fn test_report_all_flag() {
        let cli = cli(&["--report", "all"]);
        assert_eq!(ReportMode::from(cli.report), ReportMode::AllViolations);
    }

    #[test]
    fn test_non_standalone_requires_resource_list() {
        assert!(parse_input("apiVersion: v1\nkind: Service\n", false).is_err());
        assert!(parse_input("apiVersion: v1\nkind: Service\n", true).is_ok());
    }

    #[test]
    fn test_execute_writes_results_and_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.yaml");
        let output = dir.path().join("out.yaml");
        let config = dir.path().join("fn-config.yaml");
        fs::write(&input, PLAN_LIST).unwrap();
        fs::write(&config, CONFIG).unwrap();

        let cli = cli(&[
            config.to_str().unwrap(),
            "--input",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);
        assert_eq!(execute(&cli).unwrap(), 1);

        let raw = fs::read_to_string(&output).unwrap();
        assert!(raw.contains("name: block-mutation"));
        assert!(raw.contains("severity: error"));
        assert!(raw.contains("changed from"));
        assert!(raw.contains("LoadBalancer"));

        let written = ResourceList::from_yaml(&raw).unwrap();
        assert_eq!(written.items, ResourceList::from_yaml(PLAN_LIST).unwrap().items);
    }

    #[test]
    fn test_execute_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli(&["--input", dir.path().join("absent.yaml").to_str().unwrap()]);
        let err = execute(&cli).unwrap_err();
        assert!(format!("{err:#}").starts_with("failed to read input"));
    }

    #[test]
    fn test_standalone_stream_keeps_scalar_text() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.yaml");
        let output = dir.path().join("out.yaml");
        let config = dir.path().join("fn-config.yaml");
        let stream = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\ndata:\n  version: 1.10\n  port: 0x1F\n---\napiVersion: kpt.dev/v1alpha1\nkind: Plan\nspec:\n  actions: []\n";
        fs::write(&input, stream).unwrap();
        fs::write(&config, CONFIG).unwrap();

        let cli = cli(&[
            config.to_str().unwrap(),
            "--input",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);
        assert_eq!(execute(&cli).unwrap(), 0);
        assert_eq!(fs::read_to_string(&output).unwrap(), stream);
    }

    #[test]
    fn test_execute_passes_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.yaml");
        let output = dir.path().join("out.yaml");
        fs::write(&input, PLAN_LIST).unwrap();

        let cli = cli(&[
            "--local-config",
            dir.path().join("absent.yaml").to_str().unwrap(),
            "--input",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);
        assert_eq!(execute(&cli).unwrap(), 0);
        assert_eq!(
            ResourceList::from_yaml(&fs::read_to_string(&output).unwrap()).unwrap(),
            ResourceList::from_yaml(PLAN_LIST).unwrap()
        );
    }
}
