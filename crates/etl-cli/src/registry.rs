//! Provider and transform registry wiring.
//!
//! Registries are assembled once at startup; the orchestrator only ever
//! reads them.

use std::sync::Arc;

use etl_core::{ProviderRegistry, TransformRegistry};
use etl_ingest::{CsvExtract, JsonExtract};
use etl_output::{CsvLoad, JsonLoad};

/// File-based providers shipped with the runner.
pub fn providers() -> Arc<ProviderRegistry> {
    Arc::new(
        ProviderRegistry::new()
            .with_extractor("csv", Arc::new(CsvExtract))
            .with_extractor("json", Arc::new(JsonExtract))
            .with_loader("csv", Arc::new(CsvLoad))
            .with_loader("json", Arc::new(JsonLoad)),
    )
}

/// The default transform library plus external script support.
pub fn transforms() -> Arc<TransformRegistry> {
    Arc::new(etl_transform::default_registry())
}
