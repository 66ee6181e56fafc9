//! Load provider tests over temporary directories.

use polars::prelude::{NamedFrom, Series};
use tempfile::TempDir;

use etl_core::{LoadProvider, WriteMode};
use etl_model::{LoadConfig, Table};
use etl_output::{CsvLoad, JsonLoad};

fn sample_table() -> Table {
    Table::from_columns(vec![
        Series::new("name".into(), vec!["ada", "grace"]).into(),
        Series::new("age".into(), vec![36i64, 45]).into(),
    ])
    .unwrap()
}

fn load_config(target_type: &str, config: serde_json::Value) -> LoadConfig {
    LoadConfig {
        target_type: target_type.to_string(),
        config,
    }
}

#[test]
fn csv_create_writes_header_and_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let receipt = CsvLoad
        .write(
            &sample_table(),
            &load_config("csv", serde_json::json!({"path": path})),
            WriteMode::Create,
        )
        .unwrap();
    assert_eq!(receipt.rows_written, 2);
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "name,age\nada,36\ngrace,45\n");
}

#[test]
fn csv_append_adds_rows_without_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let config = load_config("csv", serde_json::json!({"path": path}));
    CsvLoad
        .write(&sample_table(), &config, WriteMode::Create)
        .unwrap();
    CsvLoad
        .write(&sample_table(), &config, WriteMode::Append)
        .unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "name,age");
    assert_eq!(lines[3], "ada,36");
}

#[test]
fn csv_create_truncates_previous_contents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    std::fs::write(&path, "stale data\n").unwrap();
    CsvLoad
        .write(
            &sample_table(),
            &load_config("csv", serde_json::json!({"path": path})),
            WriteMode::Create,
        )
        .unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("name,age"));
    assert!(!contents.contains("stale"));
}

#[test]
fn csv_creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/deep/out.csv");
    let receipt = CsvLoad
        .write(
            &sample_table(),
            &load_config("csv", serde_json::json!({"path": path})),
            WriteMode::Create,
        )
        .unwrap();
    assert_eq!(receipt.rows_written, 2);
    assert!(path.exists());
}

#[test]
fn csv_missing_path_is_a_configuration_error() {
    let error = CsvLoad
        .write(
            &sample_table(),
            &load_config("csv", serde_json::Value::Null),
            WriteMode::Create,
        )
        .unwrap_err();
    assert!(error.to_string().contains("must not be empty"));
}

#[test]
fn json_records_array_round_trips_types() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.json");
    JsonLoad
        .write(
            &sample_table(),
            &load_config("json", serde_json::json!({"path": path})),
            WriteMode::Create,
        )
        .unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], "ada");
    assert_eq!(records[0]["age"], 36);
}

#[test]
fn json_lines_supports_append() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.ndjson");
    let config = load_config("json", serde_json::json!({"path": path, "lines": true}));
    JsonLoad
        .write(&sample_table(), &config, WriteMode::Create)
        .unwrap();
    JsonLoad
        .write(&sample_table(), &config, WriteMode::Append)
        .unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 4);
    for line in contents.lines() {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(record.is_object());
    }
}

#[test]
fn json_array_append_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.json");
    let config = load_config("json", serde_json::json!({"path": path}));
    JsonLoad
        .write(&sample_table(), &config, WriteMode::Create)
        .unwrap();
    let error = JsonLoad
        .write(&sample_table(), &config, WriteMode::Append)
        .unwrap_err();
    assert!(error.to_string().contains("lines: true"));
}

#[test]
fn null_cells_write_as_json_null() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.json");
    let table = Table::from_columns(vec![
        Series::new("v".into(), vec![Some(1i64), None]).into(),
    ])
    .unwrap();
    JsonLoad
        .write(
            &table,
            &load_config("json", serde_json::json!({"path": path})),
            WriteMode::Create,
        )
        .unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value[1]["v"], serde_json::Value::Null);
}
