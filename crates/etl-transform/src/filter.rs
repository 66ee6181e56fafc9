//! Row filtering by a single-column predicate.

use anyhow::Result;
use polars::prelude::{BooleanChunked, NewChunkedArray};
use serde::{Deserialize, Serialize};

use etl_common::{any_to_f64, any_to_string, is_missing, parse_f64};
use etl_core::TransformStep;
use etl_model::Table;

use crate::error::TransformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    #[default]
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    pub column: String,
    pub op: CompareOp,
    pub value: serde_json::Value,
}

/// Keep the rows whose cell satisfies the predicate.
///
/// Comparison is numeric when both the cell and the configured value parse
/// as numbers, textual otherwise. Missing cells never satisfy the
/// predicate.
#[derive(Debug)]
pub struct FilterRowsStep {
    options: FilterOptions,
    target_number: Option<f64>,
    target_text: String,
}

impl FilterRowsStep {
    pub fn from_options(options: FilterOptions) -> Result<Self> {
        if options.column.trim().is_empty() {
            return Err(TransformError::BadStepConfig {
                step: "filter_rows",
                reason: "column is required".to_string(),
            }
            .into());
        }
        if options.value.is_null() {
            return Err(TransformError::BadStepConfig {
                step: "filter_rows",
                reason: "value is required".to_string(),
            }
            .into());
        }
        let target_number = match &options.value {
            serde_json::Value::Number(number) => number.as_f64(),
            serde_json::Value::String(text) => parse_f64(text),
            _ => None,
        };
        let target_text = match &options.value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Ok(Self {
            options,
            target_number,
            target_text,
        })
    }
}

fn satisfies(op: CompareOp, ordering: std::cmp::Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering.is_eq(),
        CompareOp::Ne => !ordering.is_eq(),
        CompareOp::Gt => ordering.is_gt(),
        CompareOp::Ge => !ordering.is_lt(),
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::Le => !ordering.is_gt(),
        CompareOp::Contains => false,
    }
}

impl TransformStep for FilterRowsStep {
    fn name(&self) -> &str {
        "filter_rows"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        let column = table.column(&self.options.column)?;
        let mut keep = Vec::with_capacity(table.n_rows());
        for idx in 0..table.n_rows() {
            let value = column.get(idx)?;
            if is_missing(&value) {
                keep.push(false);
                continue;
            }
            let matched = if self.options.op == CompareOp::Contains {
                any_to_string(value).contains(&self.target_text)
            } else {
                let ordering = match (any_to_f64(value.clone()), self.target_number) {
                    (Some(cell), Some(target)) => cell.partial_cmp(&target),
                    _ => Some(any_to_string(value).as_str().cmp(self.target_text.as_str())),
                };
                ordering.is_some_and(|ordering| satisfies(self.options.op, ordering))
            };
            keep.push(matched);
        }
        let mask = BooleanChunked::from_slice("filter".into(), &keep);
        Ok(Table::new(table.data().filter(&mask)?))
    }
}
