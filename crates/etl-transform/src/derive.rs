//! Column derivation from two existing columns.

use anyhow::Result;
use polars::prelude::{NamedFrom, Series};
use serde::{Deserialize, Serialize};

use etl_common::{any_to_f64, any_to_string, is_missing};
use etl_core::TransformStep;
use etl_model::Table;

use crate::error::TransformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeriveOp {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    Concat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeriveOptions {
    /// Name of the derived column; replaces an existing column of the same
    /// name.
    pub name: String,
    /// Exactly two source columns.
    pub from: Vec<String>,
    pub op: DeriveOp,
    /// Separator for `concat`.
    pub separator: String,
}

pub struct DeriveColumnStep {
    options: DeriveOptions,
}

impl DeriveColumnStep {
    pub fn from_options(options: DeriveOptions) -> Result<Self> {
        if options.name.trim().is_empty() {
            return Err(TransformError::BadStepConfig {
                step: "derive_column",
                reason: "name is required".to_string(),
            }
            .into());
        }
        if options.from.len() != 2 {
            return Err(TransformError::BadStepConfig {
                step: "derive_column",
                reason: format!("from must name exactly 2 columns, got {}", options.from.len()),
            }
            .into());
        }
        Ok(Self { options })
    }
}

impl TransformStep for DeriveColumnStep {
    fn name(&self) -> &str {
        "derive_column"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        let left = table.column(&self.options.from[0])?;
        let right = table.column(&self.options.from[1])?;
        let height = table.n_rows();
        let name = self.options.name.as_str();

        let derived = if self.options.op == DeriveOp::Concat {
            let mut values: Vec<Option<String>> = Vec::with_capacity(height);
            for idx in 0..height {
                let a = left.get(idx)?;
                let b = right.get(idx)?;
                if is_missing(&a) && is_missing(&b) {
                    values.push(None);
                } else {
                    values.push(Some(format!(
                        "{}{}{}",
                        any_to_string(a),
                        self.options.separator,
                        any_to_string(b)
                    )));
                }
            }
            Series::new(name.into(), values)
        } else {
            let mut values: Vec<Option<f64>> = Vec::with_capacity(height);
            for idx in 0..height {
                let a = any_to_f64(left.get(idx)?);
                let b = any_to_f64(right.get(idx)?);
                let result = match (a, b) {
                    (Some(a), Some(b)) => match self.options.op {
                        DeriveOp::Add => Some(a + b),
                        DeriveOp::Subtract => Some(a - b),
                        DeriveOp::Multiply => Some(a * b),
                        DeriveOp::Divide => {
                            if b == 0.0 {
                                None
                            } else {
                                Some(a / b)
                            }
                        }
                        DeriveOp::Concat => None,
                    },
                    _ => None,
                };
                values.push(result);
            }
            Series::new(name.into(), values)
        };

        let mut df = table.data().clone();
        df.with_column(derived)?;
        Ok(Table::new(df))
    }
}
