//! Top-level pipeline state machine.
//!
//! Drives Extract → Transform → Load and produces exactly one [`RunReport`]
//! per invocation. The orchestrator retains no state between runs;
//! process-wide state is limited to the registries, which are built once at
//! startup and never mutated mid-run.

use std::sync::Arc;

use anyhow::Error;
use tracing::{debug, info, info_span};

use etl_model::{
    ErrorKind, ErrorReport, PipelineConfig, RunReport, RunStatus, StepResult, StepStatus, Table,
    validate_config,
};

use crate::cancel::CancelFlag;
use crate::capability::WriteMode;
use crate::classify::{ErrorScope, classify};
use crate::dispatch::{ExtractDispatcher, LoadDispatcher};
use crate::engine::TransformEngine;
use crate::registry::{ProviderRegistry, ResolvedStep, TransformRegistry};

/// Pipeline stages. `Done` and `Failed` are terminal.
///
/// Chunked runs hold the marker at `Loading` while the chunk train drains;
/// the marker is monotone and never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Extracting,
    Transforming,
    Loading,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Legal forward transitions; `Failed` is reachable from any
    /// non-terminal stage.
    pub fn can_advance_to(self, next: Self) -> bool {
        if next == Self::Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Self::Idle, Self::Extracting)
                | (Self::Extracting, Self::Transforming)
                | (Self::Transforming, Self::Loading)
                | (Self::Loading, Self::Done)
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Transforming => "transforming",
            Self::Loading => "loading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Sequences one pipeline run end to end.
pub struct Orchestrator {
    providers: Arc<ProviderRegistry>,
    transforms: Arc<TransformRegistry>,
    cancel: CancelFlag,
}

impl Orchestrator {
    pub fn new(providers: Arc<ProviderRegistry>, transforms: Arc<TransformRegistry>) -> Self {
        Self {
            providers,
            transforms,
            cancel: CancelFlag::new(),
        }
    }

    /// Attach a cancellation flag checked at each stage transition and
    /// between chunks.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Check everything statically checkable without touching data:
    /// document structure, provider tags, step resolution.
    pub fn preflight(&self, config: &PipelineConfig) -> Result<(), ErrorReport> {
        self.prepare(config).map(|_| ())
    }

    fn prepare(&self, config: &PipelineConfig) -> Result<Vec<ResolvedStep>, ErrorReport> {
        let scope = ErrorScope::preflight();
        validate_config(config).map_err(|error| classify(&Error::new(error), &scope))?;
        self.providers
            .extractor(&config.extract.source_type)
            .map_err(|error| {
                classify(
                    &Error::new(error),
                    &ErrorScope::extract(
                        &config.extract.source_type,
                        &config.extract.query_or_endpoint,
                    ),
                )
            })?;
        self.providers
            .loader(&config.load.target_type)
            .map_err(|error| {
                classify(
                    &Error::new(error),
                    &ErrorScope::load(&config.load.target_type),
                )
            })?;
        self.transforms
            .resolve_all(&config.transform.steps)
            .map_err(|error| classify(&error, &scope))
    }

    /// Execute one run and emit its report.
    pub fn run(&self, config: &PipelineConfig) -> RunReport {
        let span = info_span!("pipeline");
        let _guard = span.enter();

        // Configuration errors are fatal and detected before any I/O.
        let steps = match self.prepare(config) {
            Ok(steps) => steps,
            Err(report) => return RunReport::failure(report),
        };
        let engine = TransformEngine::new(steps);

        let mut stage = Stage::Idle;
        if let Err(report) = self.advance(&mut stage, Stage::Extracting) {
            return RunReport::failure(report);
        }

        let extraction =
            match ExtractDispatcher::new(&self.providers).extract(&config.extract) {
                Ok(extraction) => extraction,
                Err(report) => {
                    self.fail(&mut stage);
                    return RunReport::failure(report);
                }
            };

        if let Err(report) = self.advance(&mut stage, Stage::Transforming) {
            return RunReport::failure(report);
        }

        let load_dispatcher = LoadDispatcher::new(&self.providers);
        let mut stream = extraction.into_stream();
        let mut steps_agg: Vec<StepResult> = Vec::new();
        let mut rows_in = 0u64;
        let mut rows_out = 0u64;
        let mut any_partial = false;
        let mut first_chunk = true;

        while let Some(chunk_result) = stream.next() {
            if self.cancel.is_cancelled() {
                let report = cancelled_report(stage);
                self.fail(&mut stage);
                return build_report(RunStatus::Failure, rows_in, rows_out, steps_agg, Some(report));
            }

            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(error) => {
                    let report = classify(
                        &error,
                        &ErrorScope::extract(
                            &config.extract.source_type,
                            &config.extract.query_or_endpoint,
                        ),
                    );
                    self.fail(&mut stage);
                    return build_report(
                        RunStatus::Failure,
                        rows_in,
                        rows_out,
                        steps_agg,
                        Some(report),
                    );
                }
            };
            rows_in += chunk.n_rows() as u64;

            let outcome = engine.run(chunk, config.transform.on_step_error);
            let halted = outcome.status == RunStatus::Failure;
            let halt_error = if halted {
                outcome.results.last().and_then(|result| result.error.clone())
            } else {
                None
            };
            if outcome.status == RunStatus::PartialFailure {
                any_partial = true;
            }
            merge_step_results(&mut steps_agg, outcome.results);
            if halted {
                // The partially transformed table is discarded; nothing is
                // loaded for a halted run.
                self.fail(&mut stage);
                return build_report(RunStatus::Failure, rows_in, rows_out, steps_agg, halt_error);
            }

            let mode = if first_chunk {
                if let Err(report) = self.advance(&mut stage, Stage::Loading) {
                    return build_report(
                        RunStatus::Failure,
                        rows_in,
                        rows_out,
                        steps_agg,
                        Some(report),
                    );
                }
                WriteMode::Create
            } else {
                WriteMode::Append
            };
            match load_dispatcher.load(&outcome.table, &config.load, mode) {
                Ok(receipt) => {
                    rows_out += receipt.rows_written;
                }
                Err(report) => {
                    self.fail(&mut stage);
                    return build_report(
                        RunStatus::Failure,
                        rows_in,
                        rows_out,
                        steps_agg,
                        Some(report),
                    );
                }
            }
            first_chunk = false;
        }

        if first_chunk {
            // An exhausted stream before the first chunk: create the
            // destination anyway so the run leaves a concrete, empty result.
            if let Err(report) = self.advance(&mut stage, Stage::Loading) {
                return build_report(
                    RunStatus::Failure,
                    rows_in,
                    rows_out,
                    steps_agg,
                    Some(report),
                );
            }
            if let Err(report) =
                load_dispatcher.load(&Table::empty(), &config.load, WriteMode::Create)
            {
                self.fail(&mut stage);
                return build_report(
                    RunStatus::Failure,
                    rows_in,
                    rows_out,
                    steps_agg,
                    Some(report),
                );
            }
        }

        if let Err(report) = self.advance(&mut stage, Stage::Done) {
            return build_report(RunStatus::Failure, rows_in, rows_out, steps_agg, Some(report));
        }

        let status = if any_partial {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        };
        info!(rows_in, rows_out, %stage, "pipeline run finished");
        build_report(status, rows_in, rows_out, steps_agg, None)
    }

    /// Advance the stage marker, honoring the cancellation checkpoint.
    fn advance(&self, stage: &mut Stage, next: Stage) -> Result<(), ErrorReport> {
        if self.cancel.is_cancelled() {
            let report = cancelled_report(*stage);
            *stage = Stage::Failed;
            return Err(report);
        }
        debug_assert!(stage.can_advance_to(next), "illegal transition");
        debug!(from = %stage, to = %next, "stage transition");
        *stage = next;
        Ok(())
    }

    /// Drop the machine into the terminal `Failed` stage.
    fn fail(&self, stage: &mut Stage) {
        debug!(from = %stage, to = %Stage::Failed, "stage transition");
        *stage = Stage::Failed;
    }
}

fn cancelled_report(stage: Stage) -> ErrorReport {
    ErrorReport::new(ErrorKind::Unknown, "pipeline run cancelled")
        .with_context("stage", stage.to_string())
        .with_context("cancelled", "true")
        .with_suggestion("re-run the pipeline; a cancelled run leaves no reliable output")
        .with_technical_detail("run aborted at a cooperative checkpoint")
}

fn build_report(
    status: RunStatus,
    rows_in: u64,
    rows_out: u64,
    steps: Vec<StepResult>,
    error: Option<ErrorReport>,
) -> RunReport {
    RunReport {
        status,
        rows_in,
        rows_out,
        steps,
        error,
    }
}

/// Fold one chunk's step results into the run-level aggregate.
///
/// Row counts sum across chunks; the worst status wins; the first recorded
/// error per step is kept.
fn merge_step_results(aggregate: &mut Vec<StepResult>, chunk: Vec<StepResult>) {
    for (index, result) in chunk.into_iter().enumerate() {
        match aggregate.get_mut(index) {
            None => aggregate.push(result),
            Some(existing) => {
                existing.rows_before += result.rows_before;
                existing.rows_after += result.rows_after;
                existing.status = worst_status(existing.status, result.status);
                if existing.error.is_none() {
                    existing.error = result.error;
                }
            }
        }
    }
}

fn worst_status(a: StepStatus, b: StepStatus) -> StepStatus {
    fn rank(status: StepStatus) -> u8 {
        match status {
            StepStatus::Success => 0,
            StepStatus::Skipped => 1,
            StepStatus::Failed => 2,
        }
    }
    if rank(b) > rank(a) { b } else { a }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_stages_have_no_exits() {
        for next in [
            Stage::Idle,
            Stage::Extracting,
            Stage::Transforming,
            Stage::Loading,
            Stage::Done,
            Stage::Failed,
        ] {
            assert!(!Stage::Done.can_advance_to(next));
            assert!(!Stage::Failed.can_advance_to(next));
        }
    }

    #[test]
    fn failed_is_reachable_from_any_non_terminal_stage() {
        for stage in [
            Stage::Idle,
            Stage::Extracting,
            Stage::Transforming,
            Stage::Loading,
        ] {
            assert!(stage.can_advance_to(Stage::Failed));
        }
    }

    #[test]
    fn stages_advance_in_order_only() {
        assert!(Stage::Idle.can_advance_to(Stage::Extracting));
        assert!(Stage::Extracting.can_advance_to(Stage::Transforming));
        assert!(Stage::Transforming.can_advance_to(Stage::Loading));
        assert!(Stage::Loading.can_advance_to(Stage::Done));

        assert!(!Stage::Idle.can_advance_to(Stage::Transforming));
        assert!(!Stage::Extracting.can_advance_to(Stage::Loading));
        assert!(!Stage::Loading.can_advance_to(Stage::Extracting));
        assert!(!Stage::Transforming.can_advance_to(Stage::Done));
    }

    #[test]
    fn merges_chunk_results_by_step_index() {
        let mut aggregate = Vec::new();
        merge_step_results(
            &mut aggregate,
            vec![StepResult::success("clean", 50, 48)],
        );
        merge_step_results(
            &mut aggregate,
            vec![StepResult::skipped(
                "clean",
                50,
                ErrorReport::new(ErrorKind::DataFormat, "bad chunk")
                    .with_suggestion("inspect the chunk"),
            )],
        );
        assert_eq!(aggregate.len(), 1);
        assert_eq!(aggregate[0].rows_before, 100);
        assert_eq!(aggregate[0].rows_after, 98);
        assert_eq!(aggregate[0].status, StepStatus::Skipped);
        assert!(aggregate[0].error.is_some());
    }

    #[test]
    fn worst_status_orders_failed_over_skipped_over_success() {
        assert_eq!(
            worst_status(StepStatus::Success, StepStatus::Skipped),
            StepStatus::Skipped
        );
        assert_eq!(
            worst_status(StepStatus::Failed, StepStatus::Skipped),
            StepStatus::Failed
        );
        assert_eq!(
            worst_status(StepStatus::Success, StepStatus::Success),
            StepStatus::Success
        );
    }
}
