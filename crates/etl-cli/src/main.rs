//! ETL pipeline runner CLI.

use std::io::IsTerminal;

use clap::{ColorChoice, Parser};
use tracing::Level;

use etl_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use etl_cli::commands::{cmd_extract, cmd_load, cmd_run, cmd_transform, cmd_validate};
use etl_cli::logging::{LogConfig, LogFormat, init_logging};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let code = match &cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Extract(args) => cmd_extract(args),
        Command::Transform(args) => cmd_transform(args),
        Command::Load(args) => cmd_load(args),
        Command::Validate(args) => cmd_validate(args),
    };
    std::process::exit(code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig::default();
    if let Some(level) = cli.verbosity.tracing_level_filter().into_level() {
        config.level = level;
    }
    if let Some(level) = cli.log_level {
        config.level = match level {
            LogLevelArg::Error => Level::ERROR,
            LogLevelArg::Warn => Level::WARN,
            LogLevelArg::Info => Level::INFO,
            LogLevelArg::Debug => Level::DEBUG,
            LogLevelArg::Trace => Level::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && std::io::stderr().is_terminal(),
    };
    config
}
