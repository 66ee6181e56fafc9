//! Column type inference for text-sourced tables.
//!
//! File formats without typed columns (CSV, and JSON strings) arrive as
//! text. Each column is promoted to the narrowest logical type that fits
//! every non-empty cell: integer, then float, then boolean, falling back to
//! text. Empty cells become nulls.

use polars::prelude::{Column, NamedFrom, Series};

use etl_common::{parse_bool, parse_f64, parse_i64};

use crate::table::{Table, TableError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> ColumnKind {
    let mut non_empty = 0usize;
    let mut integers = 0usize;
    let mut floats = 0usize;
    let mut booleans = 0usize;
    for cell in cells {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            continue;
        }
        non_empty += 1;
        if parse_i64(trimmed).is_some() {
            integers += 1;
        }
        if parse_f64(trimmed).is_some() {
            floats += 1;
        }
        if parse_bool(trimmed).is_some() {
            booleans += 1;
        }
    }
    if non_empty == 0 {
        return ColumnKind::Text;
    }
    if integers == non_empty {
        ColumnKind::Integer
    } else if floats == non_empty {
        ColumnKind::Float
    } else if booleans == non_empty {
        ColumnKind::Boolean
    } else {
        ColumnKind::Text
    }
}

fn typed_column(name: &str, cells: &[&str], infer: bool) -> Column {
    let kind = if infer {
        infer_kind(cells.iter().copied())
    } else {
        ColumnKind::Text
    };
    match kind {
        ColumnKind::Integer => {
            let values: Vec<Option<i64>> = cells.iter().map(|cell| parse_i64(cell)).collect();
            Series::new(name.into(), values).into()
        }
        ColumnKind::Float => {
            let values: Vec<Option<f64>> = cells.iter().map(|cell| parse_f64(cell)).collect();
            Series::new(name.into(), values).into()
        }
        ColumnKind::Boolean => {
            let values: Vec<Option<bool>> = cells.iter().map(|cell| parse_bool(cell)).collect();
            Series::new(name.into(), values).into()
        }
        ColumnKind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|cell| {
                    if cell.trim().is_empty() {
                        None
                    } else {
                        Some((*cell).to_string())
                    }
                })
                .collect();
            Series::new(name.into(), values).into()
        }
    }
}

/// Build a typed table from text headers and row-major cells.
///
/// Rows shorter than the header are padded with empty cells; longer rows
/// are truncated to the header width.
pub fn build_typed_table(
    headers: &[String],
    rows: &[Vec<String>],
    infer: bool,
) -> Result<Table, TableError> {
    let mut columns = Vec::with_capacity(headers.len());
    for (col_idx, header) in headers.iter().enumerate() {
        let cells: Vec<&str> = rows
            .iter()
            .map(|row| row.get(col_idx).map(String::as_str).unwrap_or(""))
            .collect();
        columns.push(typed_column(header, &cells, infer));
    }
    Table::from_columns(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::LogicalType;

    fn strings(values: &[&[&str]]) -> Vec<Vec<String>> {
        values
            .iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
            .collect()
    }

    #[test]
    fn promotes_columns_to_narrowest_type() {
        let headers = vec![
            "id".to_string(),
            "score".to_string(),
            "active".to_string(),
            "name".to_string(),
        ];
        let rows = strings(&[
            &["1", "9.5", "true", "ada"],
            &["2", "8", "false", "grace"],
        ]);
        let table = build_typed_table(&headers, &rows, true).unwrap();
        let schema = table.schema();
        assert_eq!(schema[0].1, LogicalType::Integer);
        assert_eq!(schema[1].1, LogicalType::Float);
        assert_eq!(schema[2].1, LogicalType::Boolean);
        assert_eq!(schema[3].1, LogicalType::Text);
    }

    #[test]
    fn empty_cells_become_nulls_not_type_demotions() {
        let headers = vec!["id".to_string()];
        let rows = strings(&[&["1"], &[""], &["3"]]);
        let table = build_typed_table(&headers, &rows, true).unwrap();
        assert_eq!(table.schema()[0].1, LogicalType::Integer);
        assert_eq!(
            table.text_rows().unwrap(),
            vec![vec!["1"], vec![""], vec!["3"]]
        );
    }

    #[test]
    fn mixed_columns_stay_text() {
        let headers = vec!["value".to_string()];
        let rows = strings(&[&["1"], &["two"]]);
        let table = build_typed_table(&headers, &rows, true).unwrap();
        assert_eq!(table.schema()[0].1, LogicalType::Text);
    }

    #[test]
    fn inference_can_be_disabled() {
        let headers = vec!["id".to_string()];
        let rows = strings(&[&["1"], &["2"]]);
        let table = build_typed_table(&headers, &rows, false).unwrap();
        assert_eq!(table.schema()[0].1, LogicalType::Text);
    }

    #[test]
    fn ragged_rows_are_padded_and_truncated() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = strings(&[&["1"], &["2", "3", "4"]]);
        let table = build_typed_table(&headers, &rows, true).unwrap();
        assert_eq!(table.n_columns(), 2);
        assert_eq!(
            table.text_rows().unwrap(),
            vec![vec!["1", ""], vec!["2", "3"]]
        );
    }
}
