//! Structured, classified representation of pipeline failures.
//!
//! Every failure that crosses a dispatcher boundary is wrapped into an
//! [`ErrorReport`] carrying a taxonomy kind, a human message, remediation
//! suggestions, and the original failure text preserved verbatim.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Failure taxonomy, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Authentication,
    Network,
    FileSystem,
    DataFormat,
    Dependency,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::Network => "network",
            Self::FileSystem => "file_system",
            Self::DataFormat => "data_format",
            Self::Dependency => "dependency",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A classified failure. Created once at the point of detection and
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
    pub suggestions: Vec<String>,
    pub technical_detail: String,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: BTreeMap::new(),
            suggestions: Vec::new(),
            technical_detail: String::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_technical_detail(mut self, detail: impl Into<String>) -> Self {
        self.technical_detail = detail.into();
        self
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
