//! JSON load provider.
//!
//! Writes a table either as a records array or as newline-delimited JSON.
//! Only the newline-delimited form supports appending, so chunked runs must
//! set `lines: true`.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use etl_common::{RetryPolicy, any_to_f64, any_to_i64, retry_with_backoff};
use etl_core::{LoadProvider, WriteMode};
use etl_model::{ConfigError, LoadConfig, Receipt, Table, options_as};

use crate::{ensure_parent_dir, is_transient_io};

/// Options carried in `load.config` for JSON targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonTargetOptions {
    /// Destination file path.
    pub path: PathBuf,
    /// One JSON object per line instead of a records array.
    pub lines: bool,
}

impl Default for JsonTargetOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            lines: false,
        }
    }
}

fn cell_value(value: polars::prelude::AnyValue<'_>) -> Value {
    use polars::prelude::AnyValue;
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        other => {
            if let Some(int) = any_to_i64(other.clone()) {
                Value::from(int)
            } else if let Some(float) = any_to_f64(other.clone()) {
                Value::from(float)
            } else {
                Value::String(etl_common::any_to_string(other))
            }
        }
    }
}

fn record_objects(table: &Table) -> Result<Vec<serde_json::Map<String, Value>>> {
    let names = table.column_names();
    let mut records = Vec::with_capacity(table.n_rows());
    for idx in 0..table.n_rows() {
        let mut record = serde_json::Map::new();
        for name in &names {
            let column = table.column(name)?;
            let value = column.get(idx).map_err(etl_model::TableError::from)?;
            record.insert(name.clone(), cell_value(value));
        }
        records.push(record);
    }
    Ok(records)
}

fn write_once(table: &Table, options: &JsonTargetOptions, mode: WriteMode) -> Result<u64> {
    ensure_parent_dir(&options.path)?;
    let records = record_objects(table)?;
    let file = match mode {
        WriteMode::Create => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&options.path),
        WriteMode::Append => OpenOptions::new().append(true).open(&options.path),
    }
    .with_context(|| format!("open json target: {}", options.path.display()))?;
    let mut writer = BufWriter::new(file);

    if options.lines {
        for record in &records {
            serde_json::to_writer(&mut writer, record)
                .with_context(|| format!("write json record: {}", options.path.display()))?;
            writer.write_all(b"\n")?;
        }
    } else {
        serde_json::to_writer_pretty(&mut writer, &records)
            .with_context(|| format!("write json target: {}", options.path.display()))?;
        writer.write_all(b"\n")?;
    }
    writer
        .flush()
        .with_context(|| format!("flush json target: {}", options.path.display()))?;
    Ok(records.len() as u64)
}

/// Load provider for JSON files, registered as `json`.
#[derive(Debug, Default)]
pub struct JsonLoad;

impl LoadProvider for JsonLoad {
    fn name(&self) -> &str {
        "json"
    }

    fn write(&self, table: &Table, config: &LoadConfig, mode: WriteMode) -> Result<Receipt> {
        let options: JsonTargetOptions =
            options_as(&config.config).map_err(|source| ConfigError::InvalidOptions {
                scope: "load.config".to_string(),
                source,
            })?;
        if options.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyField {
                section: "load",
                field: "config.path",
            }
            .into());
        }
        if mode == WriteMode::Append && !options.lines {
            return Err(ConfigError::Unsupported {
                reason: "chunked loads into a json records array cannot append; set lines: true"
                    .to_string(),
            }
            .into());
        }

        let rows_written = retry_with_backoff(
            "json load",
            RetryPolicy::default(),
            is_transient_io,
            || write_once(table, &options, mode),
        )?;
        let bytes_written = std::fs::metadata(&options.path).map(|meta| meta.len()).ok();
        info!(
            rows = rows_written,
            path = %options.path.display(),
            ?mode,
            "loaded json target"
        );
        Ok(Receipt {
            destination: options.path.display().to_string(),
            rows_written,
            bytes_written,
        })
    }
}
