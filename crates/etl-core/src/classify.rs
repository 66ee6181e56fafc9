//! Failure classification.
//!
//! Maps arbitrary provider and step failures onto the error taxonomy.
//! Classification tries typed downcasts along the error chain first, then
//! message signatures, in a fixed priority order: configuration,
//! authentication, network, file system, data format, dependency. The first
//! match wins; anything unmatched is `Unknown`. The original failure chain
//! is always preserved verbatim in `technical_detail`.

use std::collections::BTreeMap;
use std::io;

use anyhow::Error;

use etl_model::{ConfigError, ErrorKind, ErrorReport, TableError};

use crate::registry::RegistryError;

/// Where a failure was detected; folded into the report's context map.
#[derive(Debug, Clone, Default)]
pub struct ErrorScope {
    pub stage: &'static str,
    pub context: BTreeMap<String, String>,
}

impl ErrorScope {
    pub fn preflight() -> Self {
        Self {
            stage: "preflight",
            context: BTreeMap::new(),
        }
    }

    pub fn extract(source_type: &str, endpoint: &str) -> Self {
        let mut context = BTreeMap::new();
        context.insert("source_type".to_string(), source_type.to_string());
        context.insert("query_or_endpoint".to_string(), endpoint.to_string());
        Self {
            stage: "extract",
            context,
        }
    }

    pub fn transform_step(step: &str) -> Self {
        let mut context = BTreeMap::new();
        context.insert("step".to_string(), step.to_string());
        Self {
            stage: "transform",
            context,
        }
    }

    pub fn load(target_type: &str) -> Self {
        let mut context = BTreeMap::new();
        context.insert("target_type".to_string(), target_type.to_string());
        Self {
            stage: "load",
            context,
        }
    }
}

/// Classify a raw failure into a structured report.
pub fn classify(error: &Error, scope: &ErrorScope) -> ErrorReport {
    let technical_detail = format!("{error:#}");
    let kind = match_kind(error);
    let mut report = ErrorReport::new(kind, first_line(&error.to_string()))
        .with_context("stage", scope.stage)
        .with_technical_detail(technical_detail);
    for (key, value) in &scope.context {
        report = report.with_context(key.clone(), value.clone());
    }
    for suggestion in suggestions_for(kind, scope.stage) {
        report = report.with_suggestion(suggestion);
    }
    report
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or(message).to_string()
}

fn match_kind(error: &Error) -> ErrorKind {
    // Typed matches first: these are unambiguous regardless of wording.
    for cause in error.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return ErrorKind::Configuration;
        }
        if let Some(registry_error) = cause.downcast_ref::<RegistryError>() {
            return match registry_error {
                RegistryError::ScriptStepsUnavailable => ErrorKind::Dependency,
                _ => ErrorKind::Configuration,
            };
        }
        if cause.downcast_ref::<TableError>().is_some() {
            return ErrorKind::DataFormat;
        }
        if let Some(csv_error) = cause.downcast_ref::<csv::Error>() {
            // An io failure inside the csv reader is still an io failure.
            if let Some(io_kind) = std::error::Error::source(csv_error).and_then(io_kind_in) {
                return classify_io_kind(io_kind);
            }
            return ErrorKind::DataFormat;
        }
        if cause.downcast_ref::<serde_json::Error>().is_some() {
            return ErrorKind::DataFormat;
        }
    }

    let chain_text = error
        .chain()
        .map(|cause| cause.to_string().to_lowercase())
        .collect::<Vec<_>>()
        .join(" | ");

    if matches_any(
        &chain_text,
        &[
            "unknown source type",
            "unknown target type",
            "unknown builtin",
            "missing required section",
            "missing field",
            "unknown field",
            "invalid yaml",
            "did not match any variant",
            "must not be empty",
            "invalid step configuration",
        ],
    ) {
        return ErrorKind::Configuration;
    }

    if matches_any(
        &chain_text,
        &[
            "unauthorized",
            "forbidden",
            "authentication",
            "credential",
            "access denied",
            "401",
            "403",
            "login",
        ],
    ) {
        return ErrorKind::Authentication;
    }

    // Dependency signatures outrank the io downcast: a script that cannot
    // launch carries an io cause but is a missing capability, not a bad
    // path.
    if matches_any(
        &chain_text,
        &[
            "failed to launch",
            "is not available",
            "not supported",
            "unsupported",
            "not compiled",
            "not installed",
        ],
    ) {
        return ErrorKind::Dependency;
    }

    if let Some(io_kind) = error.chain().find_map(io_kind_in) {
        return classify_io_kind(io_kind);
    }

    if matches_any(
        &chain_text,
        &[
            "timed out",
            "timeout",
            "connection refused",
            "connection reset",
            "connection aborted",
            "tls",
            "certificate",
            "dns",
            "proxy",
            "host unreachable",
        ],
    ) {
        return ErrorKind::Network;
    }

    if matches_any(
        &chain_text,
        &[
            "no such file",
            "permission denied",
            "read-only file system",
            "is a directory",
            "disk",
            "quota",
            "no space left",
        ],
    ) {
        return ErrorKind::FileSystem;
    }

    if matches_any(
        &chain_text,
        &[
            "malformed",
            "parse",
            "invalid utf-8",
            "no readable schema",
            "schema mismatch",
            "unequal length",
            "cannot cast",
            "column not found",
            "validation failed",
            "unreadable output",
            "expected value",
            "invalid type",
            "not valid",
        ],
    ) {
        return ErrorKind::DataFormat;
    }

    ErrorKind::Unknown
}

fn matches_any(haystack: &str, signatures: &[&str]) -> bool {
    signatures.iter().any(|needle| haystack.contains(needle))
}

fn io_kind_in(cause: &(dyn std::error::Error + 'static)) -> Option<io::ErrorKind> {
    cause.downcast_ref::<io::Error>().map(io::Error::kind)
}

fn classify_io_kind(kind: io::ErrorKind) -> ErrorKind {
    match kind {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::TimedOut
        | io::ErrorKind::BrokenPipe => ErrorKind::Network,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => ErrorKind::DataFormat,
        _ => ErrorKind::FileSystem,
    }
}

fn suggestions_for(kind: ErrorKind, stage: &'static str) -> Vec<String> {
    match kind {
        ErrorKind::Configuration => vec![
            "check the pipeline configuration against the documented schema".to_string(),
            "run the validate command to list configuration problems without touching data"
                .to_string(),
        ],
        ErrorKind::Authentication => vec![format!(
            "verify the credentials and access rights configured for the {stage} provider"
        )],
        ErrorKind::Network => vec![
            "check connectivity to the remote endpoint and retry".to_string(),
            "raise the provider timeout if the service is slow to respond".to_string(),
        ],
        ErrorKind::FileSystem => vec![
            "check that the path exists and is readable and writable".to_string(),
            "verify there is free disk space at the destination".to_string(),
        ],
        ErrorKind::DataFormat => vec![
            "inspect the offending rows or columns in the source data".to_string(),
            "confirm delimiter, header, and type options match the file".to_string(),
        ],
        ErrorKind::Dependency => {
            vec!["register or install the capability required by this provider".to_string()]
        }
        ErrorKind::Unknown => vec![
            "re-run with --log-level debug and report the technical detail".to_string(),
        ],
    }
}
