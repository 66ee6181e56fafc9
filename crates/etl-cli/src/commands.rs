//! Subcommand implementations.
//!
//! `run` drives the orchestrator end to end; `extract`, `transform`, and
//! `load` exercise one stage at a time for debugging; `validate` checks a
//! document without touching data.
//!
//! Exit codes: 0 for success or partial failure, 1 for a failed run,
//! 2 for configuration errors detected before any data moved.

use std::path::Path;

use anyhow::Result;
use indicatif::ProgressBar;
use tracing::info;

use etl_core::{
    ErrorScope, ExtractDispatcher, Extraction, LoadDispatcher, LoadProvider, Orchestrator,
    TransformEngine, WriteMode, classify,
};
use etl_ingest::CsvExtract;
use etl_model::{
    ErrorKind, ErrorReport, LoadConfig, PipelineConfig, RunReport, RunStatus, StepResult, Table,
};
use etl_output::CsvLoad;

use crate::cli::{ExtractArgs, LoadArgs, RunArgs, TransformArgs, ValidateArgs};
use crate::config::load_config;
use crate::dryrun::dry_run;
use crate::registry::{providers, transforms};
use crate::summary::{print_error, print_run_summary, print_step_results};

/// Exit code convention expected by callers.
pub fn exit_code(report: &RunReport) -> i32 {
    match report.status {
        RunStatus::Success | RunStatus::PartialFailure => 0,
        RunStatus::Failure => {
            if report
                .error
                .as_ref()
                .is_some_and(|error| error.kind == ErrorKind::Configuration)
            {
                2
            } else {
                1
            }
        }
    }
}

fn code_for(error: &ErrorReport) -> i32 {
    if error.kind == ErrorKind::Configuration {
        2
    } else {
        1
    }
}

fn load_or_report(path: &Path) -> Result<PipelineConfig, ErrorReport> {
    load_config(path).map_err(|error| classify(&error, &ErrorScope::preflight()))
}

pub fn cmd_run(args: &RunArgs) -> i32 {
    let config = match load_or_report(&args.config) {
        Ok(config) => config,
        Err(report) => {
            let report = RunReport::failure(report);
            print_run_summary(&report);
            return exit_code(&report);
        }
    };

    let report = if args.dry_run {
        dry_run(&config)
    } else {
        Orchestrator::new(providers(), transforms()).run(&config)
    };

    if let Some(path) = &args.report {
        if let Err(error) = write_report(&report, path) {
            eprintln!("error: failed to write report: {error:#}");
            print_run_summary(&report);
            return 1;
        }
        info!(path = %path.display(), "wrote run report");
    }
    print_run_summary(&report);
    exit_code(&report)
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), report)?;
    Ok(())
}

pub fn cmd_extract(args: &ExtractArgs) -> i32 {
    match extract_to_csv(args) {
        Ok(rows) => {
            println!("extracted {rows} rows to {}", args.out.display());
            0
        }
        Err(report) => {
            print_error(&report);
            code_for(&report)
        }
    }
}

fn extract_to_csv(args: &ExtractArgs) -> Result<u64, ErrorReport> {
    let config = load_or_report(&args.config)?;
    let registry = providers();
    let extraction = ExtractDispatcher::new(&registry).extract(&config.extract)?;

    let target = LoadConfig {
        target_type: "csv".to_string(),
        config: serde_json::json!({"path": args.out}),
    };
    let load_scope = ErrorScope::load("csv");
    let extract_scope =
        ErrorScope::extract(&config.extract.source_type, &config.extract.query_or_endpoint);

    let bar = ProgressBar::new_spinner();
    bar.set_message("extracting");
    let mut rows = 0u64;
    let mut first = true;
    let mut stream = extraction.into_stream();
    while let Some(chunk_result) = stream.next() {
        let chunk = chunk_result.map_err(|error| classify(&error, &extract_scope))?;
        let mode = if first {
            WriteMode::Create
        } else {
            WriteMode::Append
        };
        let receipt = CsvLoad
            .write(&chunk, &target, mode)
            .map_err(|error| classify(&error, &load_scope))?;
        rows += receipt.rows_written;
        first = false;
        bar.set_message(format!("{rows} rows"));
    }
    if first {
        CsvLoad
            .write(&Table::empty(), &target, WriteMode::Create)
            .map_err(|error| classify(&error, &load_scope))?;
    }
    bar.finish_and_clear();
    Ok(rows)
}

fn read_csv_input(path: &Path) -> Result<Table, ErrorReport> {
    let extract = etl_model::ExtractConfig {
        source_type: "csv".to_string(),
        connection_details: serde_json::Value::Null,
        query_or_endpoint: path.display().to_string(),
    };
    let scope = ErrorScope::extract("csv", &extract.query_or_endpoint);
    let extraction = etl_core::ExtractProvider::read(&CsvExtract, &extract)
        .map_err(|error| classify(&error, &scope))?;
    match extraction {
        Extraction::Table(table) => Ok(table),
        Extraction::Chunks(stream) => {
            let mut combined: Option<Table> = None;
            for chunk_result in stream {
                let chunk = chunk_result.map_err(|error| classify(&error, &scope))?;
                combined = Some(match combined {
                    None => chunk,
                    Some(table) => {
                        let stacked = table
                            .data()
                            .vstack(chunk.data())
                            .map_err(|error| classify(&anyhow::Error::new(error), &scope))?;
                        Table::new(stacked)
                    }
                });
            }
            Ok(combined.unwrap_or_else(Table::empty))
        }
    }
}

pub fn cmd_transform(args: &TransformArgs) -> i32 {
    match transform_csv(args) {
        Ok((status, steps)) => {
            print_step_results(&steps);
            match status {
                RunStatus::Success | RunStatus::PartialFailure => {
                    println!("transformed table written to {}", args.out.display());
                    0
                }
                RunStatus::Failure => 1,
            }
        }
        Err(report) => {
            print_error(&report);
            code_for(&report)
        }
    }
}

fn transform_csv(args: &TransformArgs) -> Result<(RunStatus, Vec<StepResult>), ErrorReport> {
    let config = load_or_report(&args.config)?;
    let steps = transforms()
        .resolve_all(&config.transform.steps)
        .map_err(|error| classify(&error, &ErrorScope::preflight()))?;
    let input = read_csv_input(&args.input)?;

    let engine = TransformEngine::new(steps);
    let outcome = engine.run(input, config.transform.on_step_error);

    if outcome.status != RunStatus::Failure {
        let target = LoadConfig {
            target_type: "csv".to_string(),
            config: serde_json::json!({"path": args.out}),
        };
        CsvLoad
            .write(&outcome.table, &target, WriteMode::Create)
            .map_err(|error| classify(&error, &ErrorScope::load("csv")))?;
    }
    Ok((outcome.status, outcome.results))
}

pub fn cmd_load(args: &LoadArgs) -> i32 {
    match load_from_csv(args) {
        Ok(receipt) => {
            println!(
                "loaded {} rows to {}",
                receipt.rows_written, receipt.destination
            );
            0
        }
        Err(report) => {
            print_error(&report);
            code_for(&report)
        }
    }
}

fn load_from_csv(args: &LoadArgs) -> Result<etl_model::Receipt, ErrorReport> {
    let config = load_or_report(&args.config)?;
    let table = read_csv_input(&args.input)?;
    let registry = providers();
    LoadDispatcher::new(&registry).load(&table, &config.load, WriteMode::Create)
}

pub fn cmd_validate(args: &ValidateArgs) -> i32 {
    let config = match load_or_report(&args.config) {
        Ok(config) => config,
        Err(report) => {
            print_error(&report);
            return 2;
        }
    };
    let orchestrator = Orchestrator::new(providers(), transforms());
    match orchestrator.preflight(&config) {
        Ok(()) => {
            println!("configuration OK");
            println!(
                "  extract: {} ({})",
                config.extract.source_type, config.extract.query_or_endpoint
            );
            println!(
                "  transform: {} step(s), on_step_error: {:?}",
                config.transform.steps.len(),
                config.transform.on_step_error
            );
            println!("  load: {}", config.load.target_type);
            0
        }
        Err(report) => {
            print_error(&report);
            2
        }
    }
}
