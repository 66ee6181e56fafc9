//! Run and step reports.
//!
//! Exactly one [`RunReport`] is produced per pipeline invocation. The report
//! is what the CLI renders and optionally serializes to JSON.

use serde::{Deserialize, Serialize};

use crate::error_report::ErrorReport;

/// Overall outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every stage and every step succeeded.
    Success,
    /// The run completed but at least one transform step was skipped.
    PartialFailure,
    /// The run stopped before the load stage completed.
    Failure,
}

/// Outcome of a single transform step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Skipped,
    Failed,
}

/// Per-step record: one entry per executed (or skipped) step, in declared
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub status: StepStatus,
    pub rows_before: u64,
    pub rows_after: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl StepResult {
    pub fn success(step: impl Into<String>, rows_before: u64, rows_after: u64) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Success,
            rows_before,
            rows_after,
            error: None,
        }
    }

    pub fn skipped(step: impl Into<String>, rows: u64, error: ErrorReport) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Skipped,
            rows_before: rows,
            rows_after: rows,
            error: Some(error),
        }
    }

    pub fn failed(step: impl Into<String>, rows_before: u64, error: ErrorReport) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Failed,
            rows_before,
            rows_after: rows_before,
            error: Some(error),
        }
    }
}

/// The single summary object produced per pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub rows_in: u64,
    pub rows_out: u64,
    pub steps: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl RunReport {
    pub fn failure(error: ErrorReport) -> Self {
        Self {
            status: RunStatus::Failure,
            rows_in: 0,
            rows_out: 0,
            steps: Vec::new(),
            error: Some(error),
        }
    }

    pub fn skipped_step_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|result| result.status == StepStatus::Skipped)
            .count()
    }
}

/// Acknowledgement returned by a load provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub destination: String,
    pub rows_written: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
}
