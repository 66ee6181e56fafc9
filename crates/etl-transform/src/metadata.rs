//! Metadata stamping: constant columns and an optional load timestamp.

use std::collections::BTreeMap;

use anyhow::Result;
use polars::prelude::{NamedFrom, Series};
use serde::{Deserialize, Serialize};

use etl_core::TransformStep;
use etl_model::Table;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddMetadataOptions {
    /// Constant columns to add; an existing column of the same name is
    /// replaced.
    pub constants: BTreeMap<String, serde_json::Value>,
    /// Column to stamp with the processing time. Timestamping is opt-in;
    /// without it the step is idempotent.
    pub timestamp_column: Option<String>,
    /// Fixed value for the timestamp column; defaults to the current UTC
    /// time.
    pub timestamp_value: Option<String>,
}

pub struct AddMetadataStep {
    options: AddMetadataOptions,
}

impl AddMetadataStep {
    pub fn from_options(options: AddMetadataOptions) -> Result<Self> {
        Ok(Self { options })
    }
}

fn constant_series(name: &str, value: &serde_json::Value, height: usize) -> Series {
    match value {
        serde_json::Value::Bool(b) => Series::new(name.into(), vec![*b; height]),
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Series::new(name.into(), vec![int; height])
            } else {
                Series::new(name.into(), vec![number.as_f64().unwrap_or(f64::NAN); height])
            }
        }
        serde_json::Value::String(text) => Series::new(name.into(), vec![text.clone(); height]),
        serde_json::Value::Null => {
            let values: Vec<Option<String>> = vec![None; height];
            Series::new(name.into(), values)
        }
        other => Series::new(name.into(), vec![other.to_string(); height]),
    }
}

impl TransformStep for AddMetadataStep {
    fn name(&self) -> &str {
        "add_metadata"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        let mut df = table.data().clone();
        let height = df.height();
        for (name, value) in &self.options.constants {
            df.with_column(constant_series(name, value, height))?;
        }
        if let Some(column) = &self.options.timestamp_column {
            let stamp = self.options.timestamp_value.clone().unwrap_or_else(|| {
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
            });
            df.with_column(Series::new(column.as_str().into(), vec![stamp; height]))?;
        }
        Ok(Table::new(df))
    }
}
