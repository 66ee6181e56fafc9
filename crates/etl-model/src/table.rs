//! The in-memory tabular dataset passed between pipeline stages.
//!
//! A [`Table`] wraps a Polars `DataFrame` and enforces the invariants the
//! pipeline relies on: unique column names and equal column lengths. Stages
//! hand tables off by value; a transform step receives a reference and must
//! return a new `Table`, never mutate the one it was given.

use std::collections::BTreeSet;

use polars::prelude::{Column, DataFrame, DataType, PolarsError};
use serde::{Deserialize, Serialize};

use etl_common::any_to_string;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("duplicate column name: {name}")]
    DuplicateColumn { name: String },

    #[error("column {name} has {actual} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("column not found: {name}")]
    ColumnNotFound { name: String },

    #[error(transparent)]
    Frame(#[from] PolarsError),
}

/// Logical column type exposed to configuration and reports.
///
/// Timestamps are carried as ISO 8601 text; the `timestamp` type surfaces
/// through the `cast` and `validate_schema` transforms rather than a
/// dedicated physical dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Opaque,
}

impl LogicalType {
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::String => Self::Text,
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => Self::Integer,
            DataType::Float32 | DataType::Float64 => Self::Float,
            DataType::Boolean => Self::Boolean,
            DataType::Date | DataType::Datetime(_, _) | DataType::Time => Self::Timestamp,
            _ => Self::Opaque,
        }
    }
}

impl std::fmt::Display for LogicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// An ordered set of named, equally sized columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    data: DataFrame,
}

impl Table {
    /// Wrap an existing frame. The frame already guarantees the column
    /// invariants, so this cannot fail.
    pub fn new(data: DataFrame) -> Self {
        Self { data }
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            data: DataFrame::empty(),
        }
    }

    /// Build a table from columns, reporting duplicate names and length
    /// mismatches as table errors rather than opaque frame errors.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut seen = BTreeSet::new();
        for column in &columns {
            let name = column.name().to_string();
            if !seen.insert(name.clone()) {
                return Err(TableError::DuplicateColumn { name });
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            for column in &columns[1..] {
                if column.len() != expected {
                    return Err(TableError::LengthMismatch {
                        name: column.name().to_string(),
                        expected,
                        actual: column.len(),
                    });
                }
            }
        }
        Ok(Self {
            data: DataFrame::new(columns)?,
        })
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn into_data(self) -> DataFrame {
        self.data
    }

    pub fn n_rows(&self) -> usize {
        self.data.height()
    }

    pub fn n_columns(&self) -> usize {
        self.data.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.data.column(name).is_ok()
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.data
            .column(name)
            .map_err(|_| TableError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    /// Column names with their logical types, in column order.
    pub fn schema(&self) -> Vec<(String, LogicalType)> {
        self.data
            .get_columns()
            .iter()
            .map(|column| {
                (
                    column.name().to_string(),
                    LogicalType::from_dtype(column.dtype()),
                )
            })
            .collect()
    }

    /// Materialize every cell as text, row-major.
    ///
    /// Used by the file writers and the script-step wire format. Nulls
    /// render as empty strings.
    pub fn text_rows(&self) -> Result<Vec<Vec<String>>, TableError> {
        let height = self.n_rows();
        let mut rows = vec![Vec::with_capacity(self.n_columns()); height];
        for column in self.data.get_columns() {
            for (idx, row) in rows.iter_mut().enumerate() {
                let value = column.get(idx)?;
                row.push(any_to_string(value));
            }
        }
        Ok(rows)
    }
}
