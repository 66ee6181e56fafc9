//! Dry-run support: exercise the full state machine without real providers.
//!
//! The configuration is first preflighted against the real registries, so a
//! dry run still catches unknown tags, unknown builtins, and malformed
//! options. Execution then runs against stub providers and no-op steps.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use etl_core::{
    ExtractProvider, Extraction, LoadProvider, Orchestrator, ProviderRegistry, ScriptResolver,
    TransformRegistry, TransformStep, WriteMode,
};
use etl_model::{ExtractConfig, LoadConfig, PipelineConfig, Receipt, RunReport, Table};

use crate::registry::{providers, transforms};

struct StubExtract;

impl ExtractProvider for StubExtract {
    fn name(&self) -> &str {
        "stub"
    }

    fn read(&self, _config: &ExtractConfig) -> Result<Extraction> {
        Ok(Extraction::Table(Table::empty()))
    }
}

struct StubLoad;

impl LoadProvider for StubLoad {
    fn name(&self) -> &str {
        "stub"
    }

    fn write(&self, table: &Table, _config: &LoadConfig, _mode: WriteMode) -> Result<Receipt> {
        Ok(Receipt {
            destination: "dry-run".to_string(),
            rows_written: table.n_rows() as u64,
            bytes_written: None,
        })
    }
}

struct NoopStep {
    display: String,
}

impl TransformStep for NoopStep {
    fn name(&self) -> &str {
        &self.display
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        Ok(table.clone())
    }
}

struct NoopScriptResolver;

impl ScriptResolver for NoopScriptResolver {
    fn resolve(&self, script: &Path, _args: &[String]) -> Result<Box<dyn TransformStep>> {
        Ok(Box::new(NoopStep {
            display: script.display().to_string(),
        }))
    }
}

fn stub_transforms(real: &TransformRegistry) -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    for name in real.builtin_names() {
        let display = name.clone();
        registry = registry.with_builtin(
            name,
            Box::new(move |_| {
                Ok(Box::new(NoopStep {
                    display: display.clone(),
                }) as Box<dyn TransformStep>)
            }),
        );
    }
    registry.with_script_resolver(Box::new(NoopScriptResolver))
}

/// Run the state machine over stubs, after preflighting for real.
pub fn dry_run(config: &PipelineConfig) -> RunReport {
    let real = Orchestrator::new(providers(), transforms());
    if let Err(report) = real.preflight(config) {
        return RunReport::failure(report);
    }

    let stub_providers = Arc::new(
        ProviderRegistry::new()
            .with_extractor(config.extract.source_type.clone(), Arc::new(StubExtract))
            .with_loader(config.load.target_type.clone(), Arc::new(StubLoad)),
    );
    let stub_steps = Arc::new(stub_transforms(&transforms()));
    Orchestrator::new(stub_providers, stub_steps).run(config)
}
