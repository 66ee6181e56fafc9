//! Ordered transform step execution with a partial-failure policy.

use tracing::{debug, info_span, warn};

use etl_model::{OnStepError, RunStatus, StepResult, Table};

use crate::classify::{ErrorScope, classify};
use crate::registry::ResolvedStep;

/// Result of running a step sequence over one table.
pub struct EngineOutcome {
    pub status: RunStatus,
    /// The table after the last step; on a halt this is the output of the
    /// last successful step and the caller decides whether to keep it.
    pub table: Table,
    pub results: Vec<StepResult>,
}

/// Applies resolved steps to a table in declared order.
///
/// The engine owns no I/O and no shared state: every step receives the
/// current table by reference and must return a fresh one, so a failing
/// step can never corrupt the table the engine holds.
pub struct TransformEngine {
    steps: Vec<ResolvedStep>,
}

impl TransformEngine {
    pub fn new(steps: Vec<ResolvedStep>) -> Self {
        Self { steps }
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name.as_str()).collect()
    }

    /// Fold the step sequence over `input`.
    ///
    /// Zero steps is the identity transform: the input comes back unchanged
    /// with `Success` and no step results. A step yielding zero rows is
    /// valid and propagates to the next step.
    pub fn run(&self, input: Table, on_step_error: OnStepError) -> EngineOutcome {
        let mut current = input;
        let mut results = Vec::with_capacity(self.steps.len());
        let mut any_skipped = false;

        for resolved in &self.steps {
            let span = info_span!("step", name = %resolved.name);
            let _guard = span.enter();
            let rows_before = current.n_rows() as u64;

            match resolved.step.apply(&current) {
                Ok(next) => {
                    debug!(
                        rows_before,
                        rows_after = next.n_rows() as u64,
                        "step succeeded"
                    );
                    results.push(StepResult::success(
                        &resolved.name,
                        rows_before,
                        next.n_rows() as u64,
                    ));
                    current = next;
                }
                Err(error) => {
                    let report = classify(&error, &ErrorScope::transform_step(&resolved.name));
                    match on_step_error {
                        OnStepError::Halt => {
                            warn!(step = %resolved.name, "step failed, halting: {report}");
                            results.push(StepResult::failed(&resolved.name, rows_before, report));
                            return EngineOutcome {
                                status: RunStatus::Failure,
                                table: current,
                                results,
                            };
                        }
                        OnStepError::Skip => {
                            warn!(step = %resolved.name, "step failed, skipping: {report}");
                            any_skipped = true;
                            results.push(StepResult::skipped(&resolved.name, rows_before, report));
                        }
                    }
                }
            }
        }

        let status = if any_skipped {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        };
        EngineOutcome {
            status,
            table: current,
            results,
        }
    }
}
