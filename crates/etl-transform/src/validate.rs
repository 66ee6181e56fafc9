//! Schema validation step.
//!
//! Checks required columns, null constraints, and logical types, and fails
//! through the normal step error channel when anything is violated. The
//! table passes through unchanged; rows are never dropped.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use etl_common::{any_to_string, is_missing};
use etl_core::TransformStep;
use etl_model::{LogicalType, Table};

use crate::datetime::parse_timestamp;
use crate::error::TransformError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateOptions {
    /// Columns that must be present.
    pub required_columns: Vec<String>,
    /// Columns that must not contain missing cells.
    pub non_null: Vec<String>,
    /// Expected logical types. Integer columns satisfy a float
    /// expectation; a timestamp expectation accepts text whose non-empty
    /// cells all parse as timestamps.
    pub types: BTreeMap<String, LogicalType>,
}

pub struct ValidateSchemaStep {
    options: ValidateOptions,
}

impl ValidateSchemaStep {
    pub fn from_options(options: ValidateOptions) -> Result<Self> {
        Ok(Self { options })
    }
}

fn type_satisfied(table: &Table, name: &str, expected: LogicalType) -> Result<Option<String>> {
    let column = table.column(name)?;
    let actual = LogicalType::from_dtype(column.dtype());
    let ok = match expected {
        LogicalType::Float => matches!(actual, LogicalType::Float | LogicalType::Integer),
        LogicalType::Timestamp => {
            if actual != LogicalType::Text {
                false
            } else {
                let mut bad = 0usize;
                for idx in 0..table.n_rows() {
                    let value = column.get(idx)?;
                    if is_missing(&value) {
                        continue;
                    }
                    if parse_timestamp(&any_to_string(value)).is_none() {
                        bad += 1;
                    }
                }
                if bad > 0 {
                    return Ok(Some(format!(
                        "column {name}: {bad} cells do not parse as timestamps"
                    )));
                }
                true
            }
        }
        other => actual == other,
    };
    if ok {
        Ok(None)
    } else {
        Ok(Some(format!(
            "column {name}: expected {expected}, found {actual}"
        )))
    }
}

impl TransformStep for ValidateSchemaStep {
    fn name(&self) -> &str {
        "validate_schema"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        let mut issues: Vec<String> = Vec::new();

        for name in &self.options.required_columns {
            if !table.has_column(name) {
                issues.push(format!("missing required column: {name}"));
            }
        }

        for name in &self.options.non_null {
            if !table.has_column(name) {
                issues.push(format!("missing column for non-null check: {name}"));
                continue;
            }
            let column = table.column(name)?;
            let mut nulls = 0usize;
            for idx in 0..table.n_rows() {
                if is_missing(&column.get(idx)?) {
                    nulls += 1;
                }
            }
            if nulls > 0 {
                issues.push(format!("column {name}: {nulls} missing cells"));
            }
        }

        for (name, expected) in &self.options.types {
            if !table.has_column(name) {
                issues.push(format!("missing column for type check: {name}"));
                continue;
            }
            if let Some(issue) = type_satisfied(table, name, *expected)? {
                issues.push(issue);
            }
        }

        if issues.is_empty() {
            Ok(table.clone())
        } else {
            let summary = format!("{} problems; first: {}", issues.len(), issues[0]);
            Err(TransformError::Validation { summary, issues }.into())
        }
    }
}
