//! Extract and load dispatch.
//!
//! A dispatcher is a pure lookup from a configuration tag to a registered
//! provider. It performs no I/O of its own, never retries, and wraps every
//! provider failure through the classifier before propagating, so raw
//! errors never reach the orchestrator.

use anyhow::Error;
use tracing::debug;

use etl_model::{ErrorReport, ExtractConfig, LoadConfig, Receipt, Table};

use crate::capability::{Extraction, WriteMode};
use crate::classify::{ErrorScope, classify};
use crate::registry::ProviderRegistry;

pub struct ExtractDispatcher<'a> {
    registry: &'a ProviderRegistry,
}

impl<'a> ExtractDispatcher<'a> {
    pub fn new(registry: &'a ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn extract(&self, config: &ExtractConfig) -> Result<Extraction, ErrorReport> {
        let scope = ErrorScope::extract(&config.source_type, &config.query_or_endpoint);
        let provider = self
            .registry
            .extractor(&config.source_type)
            .map_err(|error| classify(&Error::new(error), &scope))?;
        debug!(provider = provider.name(), "dispatching extract");
        provider
            .read(config)
            .map_err(|error| classify(&error, &scope))
    }
}

pub struct LoadDispatcher<'a> {
    registry: &'a ProviderRegistry,
}

impl<'a> LoadDispatcher<'a> {
    pub fn new(registry: &'a ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn load(
        &self,
        table: &Table,
        config: &LoadConfig,
        mode: WriteMode,
    ) -> Result<Receipt, ErrorReport> {
        let scope = ErrorScope::load(&config.target_type);
        let provider = self
            .registry
            .loader(&config.target_type)
            .map_err(|error| classify(&Error::new(error), &scope))?;
        debug!(provider = provider.name(), rows = table.n_rows(), "dispatching load");
        provider
            .write(table, config, mode)
            .map_err(|error| classify(&error, &scope))
    }
}
