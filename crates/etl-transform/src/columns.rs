//! Column renaming and projection.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use etl_core::TransformStep;
use etl_model::{Table, TableError};

use crate::error::TransformError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameOptions {
    /// Old name to new name; every old name must exist. Renames apply in
    /// name order.
    pub mapping: BTreeMap<String, String>,
}

pub struct RenameColumnsStep {
    options: RenameOptions,
}

impl RenameColumnsStep {
    pub fn from_options(options: RenameOptions) -> Result<Self> {
        if options.mapping.is_empty() {
            return Err(TransformError::BadStepConfig {
                step: "rename_columns",
                reason: "mapping is required".to_string(),
            }
            .into());
        }
        Ok(Self { options })
    }
}

impl TransformStep for RenameColumnsStep {
    fn name(&self) -> &str {
        "rename_columns"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        for old in self.options.mapping.keys() {
            table.column(old)?;
        }
        let mut df = table.data().clone();
        for (old, new) in &self.options.mapping {
            df.rename(old, new.as_str().into())
                .map_err(TableError::from)?;
        }
        Ok(Table::new(df))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectOptions {
    /// Columns to keep, in the declared order.
    pub columns: Vec<String>,
}

pub struct SelectColumnsStep {
    options: SelectOptions,
}

impl SelectColumnsStep {
    pub fn from_options(options: SelectOptions) -> Result<Self> {
        if options.columns.is_empty() {
            return Err(TransformError::BadStepConfig {
                step: "select_columns",
                reason: "columns is required".to_string(),
            }
            .into());
        }
        Ok(Self { options })
    }
}

impl TransformStep for SelectColumnsStep {
    fn name(&self) -> &str {
        "select_columns"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        for name in &self.options.columns {
            table.column(name)?;
        }
        let df = table
            .data()
            .select(self.options.columns.iter().map(String::as_str))
            .map_err(TableError::from)?;
        Ok(Table::new(df))
    }
}
