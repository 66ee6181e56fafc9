//! Provider and transform registries.
//!
//! Registries are built once at process startup and are read-only
//! afterwards; dispatch is a pure lookup from a configuration tag to a
//! registered capability.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use etl_model::{ConfigError, StepSpec, options_as};

use crate::capability::{ExtractProvider, LoadProvider, TransformStep};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown source type: {source_type} (registered: {registered})")]
    UnknownSourceType {
        source_type: String,
        registered: String,
    },

    #[error("unknown target type: {target_type} (registered: {registered})")]
    UnknownTargetType {
        target_type: String,
        registered: String,
    },

    #[error("unknown builtin transform: {name} (registered: {registered})")]
    UnknownBuiltin { name: String, registered: String },

    #[error("script steps are not available: no script runner is registered")]
    ScriptStepsUnavailable,
}

/// Extract and load providers keyed by their configuration tags.
#[derive(Default)]
pub struct ProviderRegistry {
    extractors: BTreeMap<String, Arc<dyn ExtractProvider>>,
    loaders: BTreeMap<String, Arc<dyn LoadProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extractor(
        mut self,
        source_type: impl Into<String>,
        provider: Arc<dyn ExtractProvider>,
    ) -> Self {
        self.extractors.insert(source_type.into(), provider);
        self
    }

    pub fn with_loader(
        mut self,
        target_type: impl Into<String>,
        provider: Arc<dyn LoadProvider>,
    ) -> Self {
        self.loaders.insert(target_type.into(), provider);
        self
    }

    pub fn extractor(&self, source_type: &str) -> Result<&Arc<dyn ExtractProvider>, RegistryError> {
        self.extractors
            .get(source_type)
            .ok_or_else(|| RegistryError::UnknownSourceType {
                source_type: source_type.to_string(),
                registered: self.source_types().join(", "),
            })
    }

    pub fn loader(&self, target_type: &str) -> Result<&Arc<dyn LoadProvider>, RegistryError> {
        self.loaders
            .get(target_type)
            .ok_or_else(|| RegistryError::UnknownTargetType {
                target_type: target_type.to_string(),
                registered: self.target_types().join(", "),
            })
    }

    pub fn source_types(&self) -> Vec<String> {
        self.extractors.keys().cloned().collect()
    }

    pub fn target_types(&self) -> Vec<String> {
        self.loaders.keys().cloned().collect()
    }
}

/// Builds a [`TransformStep`] from its options block.
///
/// Factories validate options eagerly so bad step configuration is caught
/// in preflight, before any I/O.
pub type BuiltinFactory =
    Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn TransformStep>> + Send + Sync>;

/// Resolves an external script spec to a step capability.
///
/// Resolution must not perform I/O; the script is only launched when the
/// step runs.
pub trait ScriptResolver: Send + Sync {
    fn resolve(&self, script: &Path, args: &[String]) -> Result<Box<dyn TransformStep>>;
}

/// A step spec resolved against the registry, ready for the engine.
pub struct ResolvedStep {
    pub name: String,
    pub step: Box<dyn TransformStep>,
}

impl std::fmt::Debug for ResolvedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedStep")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Built-in transform factories plus the optional script runner.
#[derive(Default)]
pub struct TransformRegistry {
    builtins: BTreeMap<String, BuiltinFactory>,
    script_resolver: Option<Box<dyn ScriptResolver>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin(mut self, name: impl Into<String>, factory: BuiltinFactory) -> Self {
        self.builtins.insert(name.into(), factory);
        self
    }

    pub fn with_script_resolver(mut self, resolver: Box<dyn ScriptResolver>) -> Self {
        self.script_resolver = Some(resolver);
        self
    }

    pub fn builtin_names(&self) -> Vec<String> {
        self.builtins.keys().cloned().collect()
    }

    /// Resolve one declared step to an executable capability.
    pub fn resolve(&self, spec: &StepSpec) -> Result<ResolvedStep> {
        let name = spec.display_name();
        let step = match spec {
            StepSpec::Builtin { builtin, options } => {
                let factory =
                    self.builtins
                        .get(builtin)
                        .ok_or_else(|| RegistryError::UnknownBuiltin {
                            name: builtin.clone(),
                            registered: self.builtin_names().join(", "),
                        })?;
                factory(options)?
            }
            StepSpec::Script { script, args } => {
                let resolver = self
                    .script_resolver
                    .as_ref()
                    .ok_or(RegistryError::ScriptStepsUnavailable)?;
                resolver.resolve(script, args)?
            }
        };
        Ok(ResolvedStep { name, step })
    }

    /// Resolve a full step sequence, preserving declared order.
    pub fn resolve_all(&self, specs: &[StepSpec]) -> Result<Vec<ResolvedStep>> {
        specs.iter().map(|spec| self.resolve(spec)).collect()
    }
}

/// Convenience for registering builtins whose options deserialize into a
/// config struct. Malformed options surface as configuration errors.
pub fn factory_for<O, S, F>(name: &'static str, build: F) -> BuiltinFactory
where
    O: serde::de::DeserializeOwned + Default,
    S: TransformStep + 'static,
    F: Fn(O) -> Result<S> + Send + Sync + 'static,
{
    Box::new(move |options| {
        let parsed: O = options_as(options).map_err(|source| ConfigError::InvalidOptions {
            scope: name.to_string(),
            source,
        })?;
        Ok(Box::new(build(parsed)?) as Box<dyn TransformStep>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use etl_model::Table;

    struct Passthrough;

    impl TransformStep for Passthrough {
        fn name(&self) -> &str {
            "passthrough"
        }

        fn apply(&self, table: &Table) -> Result<Table> {
            Ok(table.clone())
        }
    }

    fn registry_with_passthrough() -> TransformRegistry {
        TransformRegistry::new().with_builtin(
            "passthrough",
            Box::new(|_| Ok(Box::new(Passthrough) as Box<dyn TransformStep>)),
        )
    }

    #[test]
    fn resolves_registered_builtin() {
        let registry = registry_with_passthrough();
        let spec = StepSpec::Builtin {
            builtin: "passthrough".to_string(),
            options: serde_json::Value::Null,
        };
        let resolved = registry.resolve(&spec).unwrap();
        assert_eq!(resolved.name, "passthrough");
    }

    #[test]
    fn unknown_builtin_is_an_error() {
        let registry = registry_with_passthrough();
        let spec = StepSpec::Builtin {
            builtin: "does_not_exist".to_string(),
            options: serde_json::Value::Null,
        };
        let error = registry.resolve(&spec).unwrap_err();
        assert!(
            error
                .downcast_ref::<RegistryError>()
                .is_some_and(|e| matches!(e, RegistryError::UnknownBuiltin { .. }))
        );
    }

    #[test]
    fn script_step_without_resolver_is_unavailable() {
        let registry = registry_with_passthrough();
        let spec = StepSpec::Script {
            script: "transform.sh".into(),
            args: Vec::new(),
        };
        let error = registry.resolve(&spec).unwrap_err();
        assert!(
            error
                .downcast_ref::<RegistryError>()
                .is_some_and(|e| matches!(e, RegistryError::ScriptStepsUnavailable))
        );
    }

    #[test]
    fn resolve_all_preserves_declared_order() {
        let registry = TransformRegistry::new()
            .with_builtin(
                "first",
                Box::new(|_| Ok(Box::new(Passthrough) as Box<dyn TransformStep>)),
            )
            .with_builtin(
                "second",
                Box::new(|_| Ok(Box::new(Passthrough) as Box<dyn TransformStep>)),
            );
        let specs = vec![
            StepSpec::Builtin {
                builtin: "second".to_string(),
                options: serde_json::Value::Null,
            },
            StepSpec::Builtin {
                builtin: "first".to_string(),
                options: serde_json::Value::Null,
            },
        ];
        let resolved = registry.resolve_all(&specs).unwrap();
        assert_eq!(resolved[0].name, "second");
        assert_eq!(resolved[1].name, "first");
    }
}
