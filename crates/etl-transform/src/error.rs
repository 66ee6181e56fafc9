use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("invalid step configuration for {step}: {reason}")]
    BadStepConfig { step: &'static str, reason: String },

    #[error("cannot cast column {column} to {target}: {detail}")]
    Cast {
        column: String,
        target: String,
        detail: String,
    },

    #[error("validation failed: {summary}")]
    Validation {
        summary: String,
        issues: Vec<String>,
    },

    #[error("failed to launch transform script {path}: {source}")]
    ScriptLaunch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transform script {path} exited with {status}: {stderr}")]
    ScriptFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("transform script {path} produced unreadable output: {detail}")]
    ScriptOutput { path: PathBuf, detail: String },
}
