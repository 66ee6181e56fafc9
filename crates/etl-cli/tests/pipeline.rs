//! End-to-end pipeline runs over real temporary files.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use etl_cli::cli::RunArgs;
use etl_cli::commands::{cmd_run, exit_code};
use etl_cli::config::load_config;
use etl_cli::dryrun::dry_run;
use etl_cli::registry::{providers, transforms};
use etl_core::Orchestrator;
use etl_model::{ErrorKind, RunStatus, StepStatus};

fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
}

fn people_csv(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("input.csv");
    write(
        &path,
        "name,age\nada,36\ngrace,45\nedsger,40\nbarbara,29\nannie,55\n",
    );
    path
}

fn run(config_path: &Path) -> etl_model::RunReport {
    let config = load_config(config_path).unwrap();
    Orchestrator::new(providers(), transforms()).run(&config)
}

#[test]
fn csv_to_csv_with_filter_succeeds() {
    let dir = TempDir::new().unwrap();
    let input = people_csv(&dir);
    let output = dir.path().join("output.csv");
    let config_path = dir.path().join("pipeline.yaml");
    write(
        &config_path,
        &format!(
            r#"
extract:
  source_type: csv
  query_or_endpoint: {input}
transform:
  steps:
    - builtin: filter_rows
      options:
        column: age
        op: gt
        value: 38
  on_step_error: halt
load:
  target_type: csv
  config:
    path: {output}
"#,
            input = input.display(),
            output = output.display()
        ),
    );

    let report = run(&config_path);

    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.rows_in, 5);
    assert_eq!(report.rows_out, 3);
    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].rows_before, 5);
    assert_eq!(report.steps[0].rows_after, 3);
    let contents = std::fs::read_to_string(&output).unwrap();
    assert_eq!(contents.lines().count(), 4);
    assert!(contents.contains("grace,45"));
    assert!(!contents.contains("barbara"));
}

#[test]
fn round_trip_preserves_rows_and_columns() {
    let dir = TempDir::new().unwrap();
    let input = people_csv(&dir);
    let output = dir.path().join("round_trip.csv");
    let config_path = dir.path().join("pipeline.yaml");
    write(
        &config_path,
        &format!(
            "extract:\n  source_type: csv\n  query_or_endpoint: {input}\ntransform:\n  steps: []\nload:\n  target_type: csv\n  config:\n    path: {output}\n",
            input = input.display(),
            output = output.display()
        ),
    );

    let report = run(&config_path);

    assert_eq!(report.status, RunStatus::Success);
    assert!(report.steps.is_empty());
    let original = std::fs::read_to_string(&input).unwrap();
    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(original, written);
}

#[test]
fn chunked_csv_streams_into_json_lines() {
    let dir = TempDir::new().unwrap();
    let input = people_csv(&dir);
    let output = dir.path().join("output.ndjson");
    let config_path = dir.path().join("pipeline.yaml");
    write(
        &config_path,
        &format!(
            r#"
extract:
  source_type: csv
  connection_details:
    chunk_size: 2
  query_or_endpoint: {input}
transform:
  steps: []
load:
  target_type: json
  config:
    path: {output}
    lines: true
"#,
            input = input.display(),
            output = output.display()
        ),
    );

    let report = run(&config_path);

    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.rows_in, 5);
    assert_eq!(report.rows_out, 5);
    let contents = std::fs::read_to_string(&output).unwrap();
    assert_eq!(contents.lines().count(), 5);
    let first: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert_eq!(first["name"], "ada");
    assert_eq!(first["age"], 36);
}

#[test]
fn halting_step_fails_the_run_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let input = people_csv(&dir);
    let output = dir.path().join("never.csv");
    let config_path = dir.path().join("pipeline.yaml");
    write(
        &config_path,
        &format!(
            r#"
extract:
  source_type: csv
  query_or_endpoint: {input}
transform:
  steps:
    - builtin: validate_schema
      options:
        required_columns: [department]
  on_step_error: halt
load:
  target_type: csv
  config:
    path: {output}
"#,
            input = input.display(),
            output = output.display()
        ),
    );

    let report = run(&config_path);

    assert_eq!(report.status, RunStatus::Failure);
    assert_eq!(report.steps[0].status, StepStatus::Failed);
    assert_eq!(
        report.steps[0].error.as_ref().unwrap().kind,
        ErrorKind::DataFormat
    );
    assert!(!output.exists());
    assert_eq!(exit_code(&report), 1);
}

#[test]
fn skipped_step_still_loads_with_partial_failure() {
    let dir = TempDir::new().unwrap();
    let input = people_csv(&dir);
    let output = dir.path().join("output.csv");
    let config_path = dir.path().join("pipeline.yaml");
    write(
        &config_path,
        &format!(
            r#"
extract:
  source_type: csv
  query_or_endpoint: {input}
transform:
  steps:
    - builtin: cast
      options:
        column: name
        to: integer
    - builtin: filter_rows
      options:
        column: age
        op: lt
        value: 50
  on_step_error: skip
load:
  target_type: csv
  config:
    path: {output}
"#,
            input = input.display(),
            output = output.display()
        ),
    );

    let report = run(&config_path);

    assert_eq!(report.status, RunStatus::PartialFailure);
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].status, StepStatus::Skipped);
    assert_eq!(report.steps[1].status, StepStatus::Success);
    // The second step ran on the original table.
    assert_eq!(report.steps[1].rows_before, 5);
    assert_eq!(report.rows_out, 4);
    assert_eq!(exit_code(&report), 0);
    assert!(output.exists());
}

#[test]
fn unknown_source_type_exits_with_configuration_code() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("pipeline.yaml");
    write(
        &config_path,
        "extract:\n  source_type: unknown_x\n  query_or_endpoint: whatever\ntransform:\n  steps: []\nload:\n  target_type: csv\n  config:\n    path: out.csv\n",
    );

    let report = run(&config_path);

    assert_eq!(report.status, RunStatus::Failure);
    assert_eq!(report.rows_in, 0);
    assert_eq!(report.error.as_ref().unwrap().kind, ErrorKind::Configuration);
    assert_eq!(exit_code(&report), 2);
}

#[test]
fn dry_run_exercises_the_machine_without_io() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("never.csv");
    let config_path = dir.path().join("pipeline.yaml");
    write(
        &config_path,
        &format!(
            r#"
extract:
  source_type: csv
  query_or_endpoint: /nonexistent/input.csv
transform:
  steps:
    - builtin: clean
    - builtin: filter_rows
      options:
        column: age
        op: gt
        value: 1
load:
  target_type: csv
  config:
    path: {output}
"#,
            output = output.display()
        ),
    );

    let config = load_config(&config_path).unwrap();
    let report = dry_run(&config);

    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.steps.len(), 2);
    assert!(!output.exists());
}

#[test]
fn dry_run_still_rejects_unknown_builtins() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("pipeline.yaml");
    write(
        &config_path,
        "extract:\n  source_type: csv\n  query_or_endpoint: in.csv\ntransform:\n  steps:\n    - builtin: no_such_thing\nload:\n  target_type: csv\n  config:\n    path: out.csv\n",
    );

    let config = load_config(&config_path).unwrap();
    let report = dry_run(&config);

    assert_eq!(report.status, RunStatus::Failure);
    assert_eq!(report.error.unwrap().kind, ErrorKind::Configuration);
}

#[test]
fn run_command_writes_the_report_artifact() {
    let dir = TempDir::new().unwrap();
    let input = people_csv(&dir);
    let output = dir.path().join("output.csv");
    let report_path = dir.path().join("report.json");
    let config_path = dir.path().join("pipeline.yaml");
    write(
        &config_path,
        &format!(
            "extract:\n  source_type: csv\n  query_or_endpoint: {input}\ntransform:\n  steps: []\nload:\n  target_type: csv\n  config:\n    path: {output}\n",
            input = input.display(),
            output = output.display()
        ),
    );

    let code = cmd_run(&RunArgs {
        config: config_path,
        dry_run: false,
        report: Some(report_path.clone()),
    });

    assert_eq!(code, 0);
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["status"], "success");
    assert_eq!(report["rows_in"], 5);
    assert_eq!(report["rows_out"], 5);
}
