//! External script steps.
//!
//! A script step runs a user-supplied executable, feeding the current table
//! as CSV (with header) on stdin and reading the transformed table as CSV
//! from stdout. Any failure (launch, non-zero exit, unreadable output)
//! surfaces through the normal step error channel; stderr travels with the
//! error for diagnosis.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Result;
use csv::{ReaderBuilder, WriterBuilder};
use tracing::debug;

use etl_core::{ScriptResolver, TransformStep};
use etl_model::{Table, build_typed_table};

use crate::error::TransformError;

const STDERR_LIMIT: usize = 2000;

fn table_to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut writer = WriterBuilder::new().from_writer(&mut buffer);
        writer.write_record(table.column_names())?;
        for row in table.text_rows()? {
            writer.write_record(&row)?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

fn table_from_csv(bytes: &[u8], path: &Path) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(|cell| cell.trim().to_string()).collect(),
        None => {
            return Err(TransformError::ScriptOutput {
                path: path.to_path_buf(),
                detail: "produced no output".to_string(),
            }
            .into());
        }
    };
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in records {
        let record = record?;
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    build_typed_table(&headers, &rows, true).map_err(Into::into)
}

fn truncate_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let mut text = text.trim().to_string();
    if text.len() > STDERR_LIMIT {
        text.truncate(STDERR_LIMIT);
        text.push_str("...");
    }
    text
}

/// One resolved external script invocation.
pub struct CommandScriptStep {
    path: PathBuf,
    args: Vec<String>,
    display: String,
}

impl CommandScriptStep {
    pub fn new(path: &Path, args: &[String]) -> Self {
        Self {
            path: path.to_path_buf(),
            args: args.to_vec(),
            display: path.display().to_string(),
        }
    }
}

impl TransformStep for CommandScriptStep {
    fn name(&self) -> &str {
        &self.display
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        let input = table_to_csv(table)?;
        debug!(script = %self.display, rows = table.n_rows(), "launching transform script");

        let mut child = Command::new(&self.path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TransformError::ScriptLaunch {
                path: self.path.clone(),
                source,
            })?;

        // Feed stdin from a thread so a large output cannot deadlock the
        // pipe pair.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || {
                let _ = stdin.write_all(&input);
            })
        });
        let output = child
            .wait_with_output()
            .map_err(|source| TransformError::ScriptLaunch {
                path: self.path.clone(),
                source,
            })?;
        if let Some(handle) = writer {
            let _ = handle.join();
        }

        if !output.status.success() {
            return Err(TransformError::ScriptFailed {
                path: self.path.clone(),
                status: output.status.to_string(),
                stderr: truncate_stderr(&output.stderr),
            }
            .into());
        }
        table_from_csv(&output.stdout, &self.path)
    }
}

/// Resolves script specs to [`CommandScriptStep`]s without touching the
/// filesystem.
#[derive(Debug, Default)]
pub struct CommandScriptResolver;

impl ScriptResolver for CommandScriptResolver {
    fn resolve(&self, script: &Path, args: &[String]) -> Result<Box<dyn TransformStep>> {
        Ok(Box::new(CommandScriptStep::new(script, args)))
    }
}
