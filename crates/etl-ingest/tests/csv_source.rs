//! CSV extract provider tests over real temporary files.

use std::io::Write;

use tempfile::NamedTempFile;

use etl_core::{ExtractProvider, Extraction};
use etl_ingest::CsvExtract;
use etl_model::{ExtractConfig, LogicalType};

fn config_for(path: &str, details: serde_json::Value) -> ExtractConfig {
    ExtractConfig {
        source_type: "csv".to_string(),
        connection_details: details,
        query_or_endpoint: path.to_string(),
    }
}

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn single_table(extraction: Extraction) -> etl_model::Table {
    match extraction {
        Extraction::Table(table) => table,
        Extraction::Chunks(_) => panic!("expected a single table"),
    }
}

#[test]
fn reads_typed_columns_from_csv() {
    let file = write_file("name,age,score,active\nada,36,9.5,true\ngrace,45,8.0,false\n");
    let extraction = CsvExtract
        .read(&config_for(
            file.path().to_str().unwrap(),
            serde_json::Value::Null,
        ))
        .unwrap();
    let table = single_table(extraction);
    assert_eq!(table.n_rows(), 2);
    assert_eq!(table.column_names(), vec!["name", "age", "score", "active"]);
    let schema = table.schema();
    assert_eq!(schema[1].1, LogicalType::Integer);
    assert_eq!(schema[2].1, LogicalType::Float);
    assert_eq!(schema[3].1, LogicalType::Boolean);
}

#[test]
fn honors_custom_delimiter() {
    let file = write_file("a;b\n1;2\n");
    let extraction = CsvExtract
        .read(&config_for(
            file.path().to_str().unwrap(),
            serde_json::json!({"delimiter": ";"}),
        ))
        .unwrap();
    let table = single_table(extraction);
    assert_eq!(table.column_names(), vec!["a", "b"]);
    assert_eq!(table.n_rows(), 1);
}

#[test]
fn synthesizes_headers_when_disabled() {
    let file = write_file("1,2\n3,4\n");
    let extraction = CsvExtract
        .read(&config_for(
            file.path().to_str().unwrap(),
            serde_json::json!({"has_header": false}),
        ))
        .unwrap();
    let table = single_table(extraction);
    assert_eq!(table.column_names(), vec!["column_1", "column_2"]);
    assert_eq!(table.n_rows(), 2);
}

#[test]
fn skips_blank_lines() {
    let file = write_file("a,b\n1,2\n,\n3,4\n");
    let extraction = CsvExtract
        .read(&config_for(
            file.path().to_str().unwrap(),
            serde_json::Value::Null,
        ))
        .unwrap();
    assert_eq!(single_table(extraction).n_rows(), 2);
}

#[test]
fn header_only_file_yields_empty_table_with_schema() {
    let file = write_file("a,b\n");
    let extraction = CsvExtract
        .read(&config_for(
            file.path().to_str().unwrap(),
            serde_json::Value::Null,
        ))
        .unwrap();
    let table = single_table(extraction);
    assert_eq!(table.n_rows(), 0);
    assert_eq!(table.column_names(), vec!["a", "b"]);
}

#[test]
fn empty_file_has_no_readable_schema() {
    let file = write_file("");
    let error = CsvExtract
        .read(&config_for(
            file.path().to_str().unwrap(),
            serde_json::Value::Null,
        ))
        .unwrap_err();
    assert!(error.to_string().contains("no readable schema"));
}

#[test]
fn missing_file_is_an_io_error() {
    let error = CsvExtract
        .read(&config_for("/nonexistent/input.csv", serde_json::Value::Null))
        .unwrap_err();
    assert!(error.to_string().contains("open csv source"));
}

#[test]
fn chunked_reading_preserves_row_order() {
    let mut contents = String::from("id\n");
    for i in 0..10 {
        contents.push_str(&format!("{i}\n"));
    }
    let file = write_file(&contents);
    let extraction = CsvExtract
        .read(&config_for(
            file.path().to_str().unwrap(),
            serde_json::json!({"chunk_size": 4}),
        ))
        .unwrap();
    let chunks: Vec<_> = match extraction {
        Extraction::Chunks(stream) => stream.collect::<Result<Vec<_>, _>>().unwrap(),
        Extraction::Table(_) => panic!("expected chunks"),
    };
    assert_eq!(
        chunks.iter().map(etl_model::Table::n_rows).collect::<Vec<_>>(),
        vec![4, 4, 2]
    );
    let all_ids: Vec<String> = chunks
        .iter()
        .flat_map(|chunk| chunk.text_rows().unwrap().into_iter().map(|row| row[0].clone()))
        .collect();
    let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    assert_eq!(all_ids, expected);
}

#[test]
fn chunked_header_only_file_yields_one_empty_chunk() {
    let file = write_file("a,b\n");
    let extraction = CsvExtract
        .read(&config_for(
            file.path().to_str().unwrap(),
            serde_json::json!({"chunk_size": 100}),
        ))
        .unwrap();
    let chunks: Vec<_> = match extraction {
        Extraction::Chunks(stream) => stream.collect::<Result<Vec<_>, _>>().unwrap(),
        Extraction::Table(_) => panic!("expected chunks"),
    };
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].n_rows(), 0);
    assert_eq!(chunks[0].column_names(), vec!["a", "b"]);
}

#[test]
fn invalid_options_are_a_configuration_error() {
    let file = write_file("a\n1\n");
    let error = CsvExtract
        .read(&config_for(
            file.path().to_str().unwrap(),
            serde_json::json!({"delimiter": "toolong"}),
        ))
        .unwrap_err();
    assert!(error.to_string().contains("invalid options"));
}
