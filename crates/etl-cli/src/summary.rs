//! Human-readable run output.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use etl_model::{ErrorReport, RunReport, RunStatus, StepResult, StepStatus};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn status_cell(status: StepStatus) -> Cell {
    match status {
        StepStatus::Success => Cell::new("ok").fg(Color::Green),
        StepStatus::Skipped => Cell::new("skipped").fg(Color::Yellow),
        StepStatus::Failed => Cell::new("failed").fg(Color::Red),
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

/// Per-step table: one row per declared step, in execution order.
pub fn print_step_results(steps: &[StepResult]) {
    if steps.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Step"),
        header_cell("Status"),
        header_cell("Rows in"),
        header_cell("Rows out"),
        header_cell("Error"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for result in steps {
        let error = result
            .error
            .as_ref()
            .map(|error| error.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&result.step),
            status_cell(result.status),
            Cell::new(result.rows_before),
            Cell::new(result.rows_after),
            Cell::new(error),
        ]);
    }
    println!("{table}");
}

pub fn print_run_summary(report: &RunReport) {
    print_step_results(&report.steps);
    let status = match report.status {
        RunStatus::Success => "success",
        RunStatus::PartialFailure => "partial failure",
        RunStatus::Failure => "failure",
    };
    println!(
        "status: {status} (rows in: {}, rows out: {})",
        report.rows_in, report.rows_out
    );
    if let Some(error) = &report.error {
        print_error(error);
    }
}

/// Classified failure block: kind, message, context, remediation,
/// technical detail.
pub fn print_error(error: &ErrorReport) {
    eprintln!("error [{}]: {}", error.kind, error.message);
    for (key, value) in &error.context {
        eprintln!("  {key}: {value}");
    }
    if !error.suggestions.is_empty() {
        eprintln!("suggestions:");
        for suggestion in &error.suggestions {
            eprintln!("  - {suggestion}");
        }
    }
    if !error.technical_detail.is_empty() {
        eprintln!("detail: {}", error.technical_detail);
    }
}
