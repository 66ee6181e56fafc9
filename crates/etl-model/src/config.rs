//! Declarative pipeline configuration.
//!
//! A pipeline document has three required sections: `extract`, `transform`,
//! and `load`. Structural problems are configuration errors detected before
//! any I/O happens, and they are always fatal.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required section: {section}")]
    MissingSection { section: &'static str },

    #[error("{section}.{field} must not be empty")]
    EmptyField {
        section: &'static str,
        field: &'static str,
    },

    #[error("transform step {index}: {reason}")]
    InvalidStep { index: usize, reason: String },

    #[error("invalid options for {scope}: {source}")]
    InvalidOptions {
        scope: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{reason}")]
    Unsupported { reason: String },

    #[error("malformed pipeline document {path}: {detail}")]
    Parse { path: String, detail: String },

    #[error("environment variable {name} referenced in configuration is not set")]
    MissingEnvVar { name: String },
}

/// The full declarative pipeline document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub extract: ExtractConfig,
    pub transform: TransformConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Tag selecting the extract provider (e.g. "csv", "json").
    pub source_type: String,
    /// Provider-specific options, passed through verbatim.
    #[serde(default)]
    pub connection_details: serde_json::Value,
    /// What to read: a file path for file providers, a query or endpoint
    /// for connection-oriented ones.
    pub query_or_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Steps in execution order. An empty list is a valid identity
    /// transform.
    #[serde(default)]
    pub steps: Vec<StepSpec>,
    #[serde(default)]
    pub on_step_error: OnStepError,
}

/// What to do when an individual transform step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnStepError {
    /// Stop the run at the failing step.
    #[default]
    Halt,
    /// Record the failure, keep the previous table, continue.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Tag selecting the load provider (e.g. "csv", "json").
    pub target_type: String,
    /// Provider-specific options, passed through verbatim.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// One configured unit of transformation work.
///
/// Either an external script or a named built-in; declared order is
/// execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Script {
        script: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
    Builtin {
        builtin: String,
        #[serde(default)]
        options: serde_json::Value,
    },
}

impl StepSpec {
    /// Display name used in step results and logs.
    pub fn display_name(&self) -> String {
        match self {
            Self::Script { script, .. } => script.display().to_string(),
            Self::Builtin { builtin, .. } => builtin.clone(),
        }
    }
}

/// Deserialize a provider or step options value.
///
/// An absent options block (JSON null) yields the defaults.
pub fn options_as<T>(value: &serde_json::Value) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        Ok(T::default())
    } else {
        serde_json::from_value(value.clone())
    }
}

/// Check the statically verifiable invariants of a pipeline document.
///
/// This performs no I/O: script paths are not probed and provider tags are
/// resolved later against the registry.
pub fn validate_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.extract.source_type.trim().is_empty() {
        return Err(ConfigError::EmptyField {
            section: "extract",
            field: "source_type",
        });
    }
    if config.extract.query_or_endpoint.trim().is_empty() {
        return Err(ConfigError::EmptyField {
            section: "extract",
            field: "query_or_endpoint",
        });
    }
    if config.load.target_type.trim().is_empty() {
        return Err(ConfigError::EmptyField {
            section: "load",
            field: "target_type",
        });
    }
    for (index, step) in config.transform.steps.iter().enumerate() {
        match step {
            StepSpec::Script { script, .. } => {
                if script.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidStep {
                        index,
                        reason: "script path must not be empty".to_string(),
                    });
                }
            }
            StepSpec::Builtin { builtin, options } => {
                if builtin.trim().is_empty() {
                    return Err(ConfigError::InvalidStep {
                        index,
                        reason: "builtin name must not be empty".to_string(),
                    });
                }
                if !options.is_null() && !options.is_object() {
                    return Err(ConfigError::InvalidStep {
                        index,
                        reason: format!("options for {builtin} must be a mapping"),
                    });
                }
            }
        }
    }
    Ok(())
}
