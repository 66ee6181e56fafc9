//! Column type casting.

use anyhow::Result;
use polars::prelude::{AnyValue, NamedFrom, Series};
use serde::{Deserialize, Serialize};

use etl_common::{any_to_f64, any_to_i64, any_to_string, is_missing, parse_bool};
use etl_core::TransformStep;
use etl_model::{LogicalType, Table};

use crate::datetime::parse_timestamp;
use crate::error::TransformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastOnError {
    /// An unconvertible cell fails the step.
    #[default]
    Fail,
    /// An unconvertible cell becomes null.
    Null,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CastOptions {
    pub column: String,
    pub to: Option<LogicalType>,
    pub on_error: CastOnError,
}

pub struct CastStep {
    column: String,
    target: LogicalType,
    on_error: CastOnError,
}

impl CastStep {
    pub fn from_options(options: CastOptions) -> Result<Self> {
        if options.column.trim().is_empty() {
            return Err(TransformError::BadStepConfig {
                step: "cast",
                reason: "column is required".to_string(),
            }
            .into());
        }
        let target = options.to.ok_or_else(|| TransformError::BadStepConfig {
            step: "cast",
            reason: "to is required".to_string(),
        })?;
        if target == LogicalType::Opaque {
            return Err(TransformError::BadStepConfig {
                step: "cast",
                reason: "opaque is not a cast target".to_string(),
            }
            .into());
        }
        Ok(Self {
            column: options.column,
            target,
            on_error: options.on_error,
        })
    }

    fn cast_failure(&self, idx: usize, value: &AnyValue<'_>) -> TransformError {
        TransformError::Cast {
            column: self.column.clone(),
            target: self.target.to_string(),
            detail: format!("row {idx} value {:?} does not convert", any_to_string(value.clone())),
        }
    }
}

fn to_integer(value: &AnyValue<'_>) -> Option<i64> {
    match value {
        AnyValue::Float32(v) => Some(*v as i64),
        AnyValue::Float64(v) => Some(*v as i64),
        other => any_to_i64(other.clone()),
    }
}

impl TransformStep for CastStep {
    fn name(&self) -> &str {
        "cast"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        let column = table.column(&self.column)?;
        let height = table.n_rows();
        let name = self.column.as_str();

        macro_rules! convert {
            ($ty:ty, $convert:expr) => {{
                let mut values: Vec<Option<$ty>> = Vec::with_capacity(height);
                for idx in 0..height {
                    let value = column.get(idx)?;
                    if is_missing(&value) {
                        values.push(None);
                        continue;
                    }
                    match $convert(&value) {
                        Some(converted) => values.push(Some(converted)),
                        None => match self.on_error {
                            CastOnError::Fail => {
                                return Err(self.cast_failure(idx, &value).into());
                            }
                            CastOnError::Null => values.push(None),
                        },
                    }
                }
                Series::new(name.into(), values)
            }};
        }

        let cast = match self.target {
            LogicalType::Integer => convert!(i64, to_integer),
            LogicalType::Float => convert!(f64, |value: &AnyValue<'_>| any_to_f64(value.clone())),
            LogicalType::Boolean => convert!(bool, |value: &AnyValue<'_>| match value {
                AnyValue::Boolean(b) => Some(*b),
                other => parse_bool(&any_to_string(other.clone())),
            }),
            LogicalType::Timestamp => convert!(String, |value: &AnyValue<'_>| parse_timestamp(
                &any_to_string(value.clone())
            )),
            LogicalType::Text | LogicalType::Opaque => {
                convert!(String, |value: &AnyValue<'_>| Some(any_to_string(
                    value.clone()
                )))
            }
        };

        let mut df = table.data().clone();
        df.with_column(cast)?;
        Ok(Table::new(df))
    }
}
