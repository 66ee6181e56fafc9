//! Cell cleanup: trimming, blank-row removal, deduplication.

use std::collections::BTreeSet;

use anyhow::Result;
use polars::prelude::{BooleanChunked, DataType, NamedFrom, NewChunkedArray, Series};
use serde::{Deserialize, Serialize};

use etl_common::is_missing;
use etl_core::TransformStep;
use etl_model::Table;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    /// Trim surrounding whitespace from text cells; blank cells become
    /// nulls.
    pub trim: bool,
    /// Drop rows where every cell is missing.
    pub drop_empty_rows: bool,
    /// Drop exact duplicate rows, keeping the first occurrence.
    pub drop_duplicates: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            trim: true,
            drop_empty_rows: true,
            drop_duplicates: false,
        }
    }
}

pub struct CleanStep {
    options: CleanOptions,
}

impl CleanStep {
    pub fn from_options(options: CleanOptions) -> Result<Self> {
        Ok(Self { options })
    }
}

impl TransformStep for CleanStep {
    fn name(&self) -> &str {
        "clean"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        let mut df = table.data().clone();

        if self.options.trim {
            let names = df.get_column_names_owned();
            for name in names {
                let is_text = df.column(name.as_str())?.dtype() == &DataType::String;
                if !is_text {
                    continue;
                }
                let values: Vec<Option<String>> = {
                    let ca = df.column(name.as_str())?.str()?;
                    ca.into_iter()
                        .map(|cell| {
                            cell.and_then(|raw| {
                                let trimmed = raw.trim();
                                if trimmed.is_empty() {
                                    None
                                } else {
                                    Some(trimmed.to_string())
                                }
                            })
                        })
                        .collect()
                };
                df.with_column(Series::new(name.clone(), values))?;
            }
        }

        if self.options.drop_empty_rows && df.height() > 0 {
            let mut keep = vec![false; df.height()];
            for column in df.get_columns() {
                for (idx, keep_row) in keep.iter_mut().enumerate() {
                    if !*keep_row && !is_missing(&column.get(idx)?) {
                        *keep_row = true;
                    }
                }
            }
            if keep.contains(&false) {
                let mask = BooleanChunked::from_slice("keep".into(), &keep);
                df = df.filter(&mask)?;
            }
        }

        if self.options.drop_duplicates && df.height() > 0 {
            let rows = Table::new(df.clone()).text_rows()?;
            let mut seen = BTreeSet::new();
            let keep: Vec<bool> = rows
                .iter()
                .map(|row| seen.insert(row.join("\u{1f}")))
                .collect();
            if keep.contains(&false) {
                let mask = BooleanChunked::from_slice("dedupe".into(), &keep);
                df = df.filter(&mask)?;
            }
        }

        Ok(Table::new(df))
    }
}
