//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "etl",
    version,
    about = "Configuration-driven ETL pipeline runner",
    long_about = "Run declarative extract-transform-load pipelines.\n\n\
                  A pipeline document names a data source, an ordered list of\n\
                  transform steps (built-ins or external scripts), and a data\n\
                  destination. Each stage is dispatched to a registered provider\n\
                  and every failure is classified with remediation hints."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute a full pipeline from a configuration document.
    Run(RunArgs),

    /// Run the extract stage alone and write the table as CSV.
    Extract(ExtractArgs),

    /// Run the transform steps alone over a CSV file.
    Transform(TransformArgs),

    /// Run the load stage alone from a CSV file.
    Load(LoadArgs),

    /// Check a configuration document without touching any data.
    Validate(ValidateArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Pipeline configuration (YAML or JSON).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Exercise the full state machine with stub providers; no real I/O.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Write the run report as JSON.
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ExtractArgs {
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Where to write the extracted table (CSV).
    #[arg(long = "out", value_name = "PATH")]
    pub out: PathBuf,
}

#[derive(Parser)]
pub struct TransformArgs {
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Input table (CSV).
    #[arg(long = "input", value_name = "PATH")]
    pub input: PathBuf,

    /// Where to write the transformed table (CSV).
    #[arg(long = "out", value_name = "PATH")]
    pub out: PathBuf,
}

#[derive(Parser)]
pub struct LoadArgs {
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Input table (CSV) to load into the configured target.
    #[arg(long = "input", value_name = "PATH")]
    pub input: PathBuf,
}

#[derive(Parser)]
pub struct ValidateArgs {
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
