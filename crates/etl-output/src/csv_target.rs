//! CSV load provider.
//!
//! Writes a table as delimited text. The first chunk of a run creates the
//! file and writes the header; appended chunks add rows only. Transient I/O
//! failures get one bounded-backoff retry round before surfacing.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use tracing::info;

use etl_common::{RetryPolicy, retry_with_backoff};
use etl_core::{LoadProvider, WriteMode};
use etl_model::{ConfigError, LoadConfig, Receipt, Table, options_as};

use crate::{ensure_parent_dir, is_transient_io};

/// Options carried in `load.config` for CSV targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvTargetOptions {
    /// Destination file path.
    pub path: PathBuf,
    /// Field delimiter; a single character.
    pub delimiter: char,
    /// Write a header row when creating the file.
    pub header: bool,
}

impl Default for CsvTargetOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            delimiter: ',',
            header: true,
        }
    }
}

/// Load provider for delimited files, registered as `csv`.
#[derive(Debug, Default)]
pub struct CsvLoad;

fn write_once(table: &Table, options: &CsvTargetOptions, mode: WriteMode) -> Result<u64> {
    ensure_parent_dir(&options.path)?;
    let file = match mode {
        WriteMode::Create => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&options.path),
        WriteMode::Append => OpenOptions::new().append(true).open(&options.path),
    }
    .with_context(|| format!("open csv target: {}", options.path.display()))?;

    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter as u8)
        .from_writer(file);

    if mode == WriteMode::Create && options.header {
        writer
            .write_record(table.column_names())
            .with_context(|| format!("write csv header: {}", options.path.display()))?;
    }
    let rows = table.text_rows()?;
    for row in &rows {
        writer
            .write_record(row)
            .with_context(|| format!("write csv row: {}", options.path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush csv target: {}", options.path.display()))?;
    Ok(rows.len() as u64)
}

impl LoadProvider for CsvLoad {
    fn name(&self) -> &str {
        "csv"
    }

    fn write(&self, table: &Table, config: &LoadConfig, mode: WriteMode) -> Result<Receipt> {
        let options: CsvTargetOptions =
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

        let rows_written = retry_with_backoff(
            "csv load",
            RetryPolicy::default(),
            is_transient_io,
            || write_once(table, &options, mode),
        )?;
        let bytes_written = std::fs::metadata(&options.path).map(|meta| meta.len()).ok();
        info!(
            rows = rows_written,
            path = %options.path.display(),
            ?mode,
            "loaded csv target"
        );
        Ok(Receipt {
            destination: options.path.display().to_string(),
            rows_written,
            bytes_written,
        })
    }
}
