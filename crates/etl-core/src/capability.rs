//! Capability interfaces implemented by pluggable providers.
//!
//! The core never touches a file, socket, or subprocess itself: extraction,
//! loading, and step execution all happen behind these traits. Provider
//! failures surface as `anyhow` errors and are classified at the dispatcher
//! boundary before they reach the orchestrator.

use anyhow::Result;
use etl_model::{ExtractConfig, LoadConfig, Receipt, Table};

/// A finite, non-restartable sequence of table chunks.
pub type TableStream = Box<dyn Iterator<Item = Result<Table>> + Send>;

/// What an extract call produced: one table, or an ordered chunk sequence
/// for datasets too large to hold at once.
pub enum Extraction {
    Table(Table),
    Chunks(TableStream),
}

impl std::fmt::Debug for Extraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table(table) => f.debug_tuple("Table").field(table).finish(),
            Self::Chunks(_) => f.debug_tuple("Chunks").finish(),
        }
    }
}

impl Extraction {
    /// Normalize to a chunk stream; a single table becomes a one-chunk
    /// stream.
    pub fn into_stream(self) -> TableStream {
        match self {
            Self::Table(table) => Box::new(std::iter::once(Ok(table))),
            Self::Chunks(stream) => stream,
        }
    }
}

/// Reads a table (or chunk sequence) from a configured source.
pub trait ExtractProvider: Send + Sync {
    /// Provider name for logs and registry listings.
    fn name(&self) -> &str;

    fn read(&self, config: &ExtractConfig) -> Result<Extraction>;
}

/// Whether a write starts a fresh destination or extends one.
///
/// The orchestrator writes the first chunk of a run with [`Create`] and
/// every later chunk with [`Append`].
///
/// [`Create`]: WriteMode::Create
/// [`Append`]: WriteMode::Append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Append,
}

/// Writes a table to a configured destination.
pub trait LoadProvider: Send + Sync {
    fn name(&self) -> &str;

    fn write(&self, table: &Table, config: &LoadConfig, mode: WriteMode) -> Result<Receipt>;
}

/// One resolved transformation: scripts and built-ins both end up here, and
/// the engine cannot tell them apart.
///
/// A step receives a table by reference and must return a new table; it
/// must never mutate shared state behind the engine's back.
pub trait TransformStep: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, table: &Table) -> Result<Table>;
}
