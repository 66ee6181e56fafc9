//! Shared fixtures for core tests: in-memory providers and closure steps.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use polars::prelude::{NamedFrom, Series};

use etl_core::{
    ExtractProvider, Extraction, LoadProvider, ResolvedStep, TransformStep, WriteMode,
};
use etl_model::{ExtractConfig, LoadConfig, Receipt, Table};

/// A table with one integer `id` column covering `0..n`.
pub fn int_table(n: usize) -> Table {
    let ids: Vec<i64> = (0..n as i64).collect();
    Table::from_columns(vec![Series::new("id".into(), ids).into()]).unwrap()
}

/// A transform step backed by a closure.
pub struct FnStep {
    name: String,
    f: Box<dyn Fn(&Table) -> Result<Table> + Send + Sync>,
}

impl FnStep {
    pub fn new(
        name: &str,
        f: impl Fn(&Table) -> Result<Table> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            f: Box::new(f),
        }
    }
}

impl TransformStep for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        (self.f)(table)
    }
}

/// Wrap a closure step for the engine.
pub fn resolved(
    name: &str,
    f: impl Fn(&Table) -> Result<Table> + Send + Sync + 'static,
) -> ResolvedStep {
    ResolvedStep {
        name: name.to_string(),
        step: Box::new(FnStep::new(name, f)),
    }
}

pub fn passthrough(name: &str) -> ResolvedStep {
    resolved(name, |table| Ok(table.clone()))
}

pub fn failing(name: &str, message: &'static str) -> ResolvedStep {
    resolved(name, move |_| Err(anyhow::anyhow!(message)))
}

/// Extract provider returning a fixed table.
pub struct MemoryExtract {
    pub table: Table,
}

impl ExtractProvider for MemoryExtract {
    fn name(&self) -> &str {
        "memory"
    }

    fn read(&self, _config: &ExtractConfig) -> Result<Extraction> {
        Ok(Extraction::Table(self.table.clone()))
    }
}

/// Extract provider yielding a fixed chunk sequence.
pub struct ChunkExtract {
    pub chunks: Vec<Table>,
}

impl ExtractProvider for ChunkExtract {
    fn name(&self) -> &str {
        "memory-chunks"
    }

    fn read(&self, _config: &ExtractConfig) -> Result<Extraction> {
        let chunks = self.chunks.clone();
        Ok(Extraction::Chunks(Box::new(chunks.into_iter().map(Ok))))
    }
}

/// Load provider recording every write.
#[derive(Clone, Default)]
pub struct MemoryLoad {
    pub calls: Arc<Mutex<Vec<(u64, WriteMode)>>>,
}

impl LoadProvider for MemoryLoad {
    fn name(&self) -> &str {
        "memory"
    }

    fn write(&self, table: &Table, _config: &LoadConfig, mode: WriteMode) -> Result<Receipt> {
        let rows = table.n_rows() as u64;
        self.calls.lock().unwrap().push((rows, mode));
        Ok(Receipt {
            destination: "memory".to_string(),
            rows_written: rows,
            bytes_written: None,
        })
    }
}

/// Load provider that always fails with an io error.
pub struct FailingLoad;

impl LoadProvider for FailingLoad {
    fn name(&self) -> &str {
        "failing"
    }

    fn write(&self, _table: &Table, _config: &LoadConfig, _mode: WriteMode) -> Result<Receipt> {
        Err(anyhow::Error::new(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        )))
    }
}
