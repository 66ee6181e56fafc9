//! CSV extract provider.
//!
//! Reads a delimited file into a typed table, normalizing headers and
//! skipping fully blank lines. With `chunk_size` set in the connection
//! details, the file is read as an ordered sequence of table chunks so
//! datasets larger than memory stream through the pipeline.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

use etl_core::{ExtractProvider, Extraction};
use etl_model::{ConfigError, ExtractConfig, Table, build_typed_table, options_as};

use crate::error::IngestError;

fn default_true() -> bool {
    true
}

/// Options carried in `extract.connection_details` for CSV sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field delimiter; a single character.
    pub delimiter: char,
    /// Whether the first row names the columns. When false, columns are
    /// synthesized as `column_1..column_n`.
    #[serde(default = "default_true")]
    pub has_header: bool,
    /// Rows per chunk; unset reads the whole file as one table.
    pub chunk_size: Option<usize>,
    /// Promote columns to integer/float/boolean when every non-empty cell
    /// parses.
    #[serde(default = "default_true")]
    pub infer_types: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
            chunk_size: None,
            infer_types: true,
        }
    }
}

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Open a reader and resolve the header row.
///
/// For headerless files the first record is returned as `pending` data so
/// it is not consumed by header synthesis.
fn open_csv(
    path: &Path,
    options: &CsvOptions,
) -> Result<(csv::Reader<File>, Vec<String>, Option<Vec<String>>)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter as u8)
        .from_path(path)
        .with_context(|| format!("open csv source: {}", path.display()))?;

    let mut record = StringRecord::new();
    let has_first = reader
        .read_record(&mut record)
        .with_context(|| format!("read csv header: {}", path.display()))?;
    if !has_first {
        return Err(IngestError::EmptySource {
            path: path.to_path_buf(),
        }
        .into());
    }

    if options.has_header {
        let headers: Vec<String> = record.iter().map(normalize_header).collect();
        Ok((reader, headers, None))
    } else {
        let first: Vec<String> = record.iter().map(|cell| normalize_cell(cell)).collect();
        let headers = (1..=first.len()).map(|i| format!("column_{i}")).collect();
        Ok((reader, headers, Some(first)))
    }
}

fn read_csv_table(path: &Path, options: &CsvOptions) -> Result<Table> {
    let (mut reader, headers, pending) = open_csv(path, options)?;
    let mut rows: Vec<Vec<String>> = pending.into_iter().filter(|row| !is_blank(row)).collect();
    let mut record = StringRecord::new();
    while reader
        .read_record(&mut record)
        .with_context(|| format!("read csv record: {}", path.display()))?
    {
        let row: Vec<String> = record.iter().map(|cell| normalize_cell(cell)).collect();
        if is_blank(&row) {
            continue;
        }
        rows.push(row);
    }
    build_typed_table(&headers, &rows, options.infer_types).map_err(Into::into)
}

/// Ordered chunk sequence over one CSV file.
///
/// Always yields at least one chunk, so a header-only file still produces
/// an empty table with its schema.
struct CsvChunkIter {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    pending: Option<Vec<String>>,
    chunk_size: usize,
    infer_types: bool,
    path: PathBuf,
    yielded: bool,
    done: bool,
}

impl Iterator for CsvChunkIter {
    type Item = Result<Table>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(self.chunk_size);
        if let Some(row) = self.pending.take()
            && !is_blank(&row)
        {
            rows.push(row);
        }
        let mut record = StringRecord::new();
        while rows.len() < self.chunk_size {
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    let row: Vec<String> = record.iter().map(|cell| normalize_cell(cell)).collect();
                    if is_blank(&row) {
                        continue;
                    }
                    rows.push(row);
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(error) => {
                    self.done = true;
                    return Some(Err(anyhow::Error::new(error)
                        .context(format!("read csv record: {}", self.path.display()))));
                }
            }
        }
        if rows.is_empty() && self.yielded {
            return None;
        }
        self.yielded = true;
        Some(build_typed_table(&self.headers, &rows, self.infer_types).map_err(Into::into))
    }
}

/// Extract provider for delimited files, registered as `csv`.
#[derive(Debug, Default)]
pub struct CsvExtract;

impl ExtractProvider for CsvExtract {
    fn name(&self) -> &str {
        "csv"
    }

    fn read(&self, config: &ExtractConfig) -> Result<Extraction> {
        let options: CsvOptions =
            options_as(&config.connection_details).map_err(|source| {
                ConfigError::InvalidOptions {
                    scope: "extract.connection_details".to_string(),
                    source,
                }
            })?;
        let path = PathBuf::from(&config.query_or_endpoint);

        match options.chunk_size {
            Some(size) if size > 0 => {
                let (reader, headers, pending) = open_csv(&path, &options)?;
                info!(path = %path.display(), chunk_size = size, "extracting csv in chunks");
                Ok(Extraction::Chunks(Box::new(CsvChunkIter {
                    reader,
                    headers,
                    pending,
                    chunk_size: size,
                    infer_types: options.infer_types,
                    path,
                    yielded: false,
                    done: false,
                })))
            }
            _ => {
                let table = read_csv_table(&path, &options)?;
                info!(
                    rows = table.n_rows(),
                    columns = table.n_columns(),
                    path = %path.display(),
                    "extracted csv table"
                );
                Ok(Extraction::Table(table))
            }
        }
    }
}
