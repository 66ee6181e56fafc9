//! JSON extract provider.
//!
//! Accepts either a JSON array of objects or newline-delimited JSON (one
//! object per line). Scalar values keep their JSON types; nested arrays and
//! objects are carried verbatim as opaque text.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::{Column, NamedFrom, Series};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use etl_core::{ExtractProvider, Extraction};
use etl_model::{ConfigError, ExtractConfig, Table, options_as};

use crate::error::IngestError;

/// Options carried in `extract.connection_details` for JSON sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonOptions {
    /// Force newline-delimited parsing. Unset auto-detects: a document
    /// starting with `[` is treated as a records array.
    pub lines: Option<bool>,
}

fn as_object(value: Value, path: &Path) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(IngestError::UnsupportedJsonShape {
            path: path.to_path_buf(),
        }
        .into()),
    }
}

fn parse_records(text: &str, lines: Option<bool>, path: &Path) -> Result<Vec<Map<String, Value>>> {
    let use_lines = lines.unwrap_or_else(|| !text.trim_start().starts_with('['));
    if use_lines {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let value: Value = serde_json::from_str(line)
                    .with_context(|| format!("parse json line: {}", path.display()))?;
                as_object(value, path)
            })
            .collect()
    } else {
        let value: Value = serde_json::from_str(text)
            .with_context(|| format!("parse json document: {}", path.display()))?;
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| as_object(item, path))
                .collect(),
            _ => Err(IngestError::UnsupportedJsonShape {
                path: path.to_path_buf(),
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonKind {
    Integer,
    Float,
    Boolean,
    Text,
}

fn column_kind(cells: &[Option<&Value>]) -> JsonKind {
    let mut non_null = 0usize;
    let mut integers = 0usize;
    let mut numbers = 0usize;
    let mut booleans = 0usize;
    for cell in cells.iter().flatten() {
        if cell.is_null() {
            continue;
        }
        non_null += 1;
        match cell {
            Value::Number(number) => {
                numbers += 1;
                if number.is_i64() {
                    integers += 1;
                }
            }
            Value::Bool(_) => booleans += 1,
            _ => {}
        }
    }
    if non_null == 0 {
        return JsonKind::Text;
    }
    if integers == non_null {
        JsonKind::Integer
    } else if numbers == non_null {
        JsonKind::Float
    } else if booleans == non_null {
        JsonKind::Boolean
    } else {
        JsonKind::Text
    }
}

fn text_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_column(name: &str, cells: &[Option<&Value>]) -> Column {
    match column_kind(cells) {
        JsonKind::Integer => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| cell.and_then(Value::as_i64))
                .collect();
            Series::new(name.into(), values).into()
        }
        JsonKind::Float => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| cell.and_then(Value::as_f64))
                .collect();
            Series::new(name.into(), values).into()
        }
        JsonKind::Boolean => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| cell.and_then(Value::as_bool))
                .collect();
            Series::new(name.into(), values).into()
        }
        JsonKind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|cell| cell.and_then(text_cell))
                .collect();
            Series::new(name.into(), values).into()
        }
    }
}

fn table_from_records(records: &[Map<String, Value>]) -> Result<Table> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.iter().any(|name| name == key) {
                names.push(key.clone());
            }
        }
    }
    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        let cells: Vec<Option<&Value>> = records.iter().map(|record| record.get(name)).collect();
        columns.push(json_column(name, &cells));
    }
    Table::from_columns(columns).map_err(Into::into)
}

/// Extract provider for JSON files, registered as `json`.
#[derive(Debug, Default)]
pub struct JsonExtract;

impl ExtractProvider for JsonExtract {
    fn name(&self) -> &str {
        "json"
    }

    fn read(&self, config: &ExtractConfig) -> Result<Extraction> {
        let options: JsonOptions =
            options_as(&config.connection_details).map_err(|source| {
                ConfigError::InvalidOptions {
                    scope: "extract.connection_details".to_string(),
                    source,
                }
            })?;
        let path = PathBuf::from(&config.query_or_endpoint);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("open json source: {}", path.display()))?;
        let records = parse_records(&text, options.lines, &path)?;
        let table = table_from_records(&records)?;
        info!(
            rows = table.n_rows(),
            columns = table.n_columns(),
            path = %path.display(),
            "extracted json table"
        );
        Ok(Extraction::Table(table))
    }
}
