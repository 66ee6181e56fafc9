//! Pipeline document loading.
//!
//! Reads YAML or JSON, substitutes `${VAR}` environment references, and
//! hands a structurally valid [`PipelineConfig`] to the core. All loader
//! failures are configuration errors.

use std::path::Path;

use anyhow::Result;

use etl_model::{ConfigError, PipelineConfig};

/// Replace `${VAR}` references with environment values.
///
/// An unset variable is a configuration error, not an empty string.
pub fn substitute_env(text: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // No closing brace: keep the literal text.
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let name = &after[..end];
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => {
                return Err(ConfigError::MissingEnvVar {
                    name: name.to_string(),
                });
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Load a pipeline document from disk.
///
/// The extension picks the format: `.json` parses as JSON, everything else
/// as YAML.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Parse {
        path: path.display().to_string(),
        detail: error.to_string(),
    })?;
    let text = substitute_env(&raw)?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config: PipelineConfig = if is_json {
        serde_json::from_str(&text).map_err(|error| ConfigError::Parse {
            path: path.display().to_string(),
            detail: error.to_string(),
        })?
    } else {
        serde_yaml::from_str(&text).map_err(|error| ConfigError::Parse {
            path: path.display().to_string(),
            detail: error.to_string(),
        })?
    };
    Ok(config)
}
