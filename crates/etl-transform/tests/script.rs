//! External script step tests (unix: scripts are small shell programs).
#![cfg(unix)]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use polars::prelude::{NamedFrom, Series};
use tempfile::TempDir;

use etl_core::TransformStep;
use etl_model::{LogicalType, Table};
use etl_transform::{CommandScriptStep, TransformError};

fn sample_table() -> Table {
    Table::from_columns(vec![
        Series::new("name".into(), vec!["ada", "grace"]).into(),
        Series::new("age".into(), vec![36i64, 45]).into(),
    ])
    .unwrap()
}

fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "{body}").unwrap();
    drop(file);
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[test]
fn identity_script_round_trips_the_table() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "identity.sh", "cat");
    let step = CommandScriptStep::new(&script, &[]);
    let result = step.apply(&sample_table()).unwrap();
    assert_eq!(result.n_rows(), 2);
    assert_eq!(result.column_names(), vec!["name", "age"]);
    assert_eq!(result.schema()[1].1, LogicalType::Integer);
}

#[test]
fn script_output_replaces_the_table() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "replace.sh",
        "printf 'count\\n42\\n'",
    );
    let step = CommandScriptStep::new(&script, &[]);
    let result = step.apply(&sample_table()).unwrap();
    assert_eq!(result.column_names(), vec!["count"]);
    assert_eq!(result.text_rows().unwrap(), vec![vec!["42"]]);
}

#[test]
fn failing_script_carries_stderr() {
    let dir = TempDir::new().unwrap();
    let script = write_script(
        &dir,
        "fail.sh",
        "echo 'bad input column' >&2; exit 3",
    );
    let step = CommandScriptStep::new(&script, &[]);
    let error = step.apply(&sample_table()).unwrap_err();
    let transform_error = error.downcast_ref::<TransformError>().unwrap();
    match transform_error {
        TransformError::ScriptFailed { stderr, .. } => {
            assert!(stderr.contains("bad input column"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_script_fails_to_launch() {
    let step = CommandScriptStep::new(std::path::Path::new("/nonexistent/transform.sh"), &[]);
    let error = step.apply(&sample_table()).unwrap_err();
    assert!(error.to_string().contains("failed to launch"));
}

#[test]
fn silent_script_is_unreadable_output() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "silent.sh", "true");
    let step = CommandScriptStep::new(&script, &[]);
    let error = step.apply(&sample_table()).unwrap_err();
    assert!(error.to_string().contains("produced no output"));
}
