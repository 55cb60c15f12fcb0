//! Engine adapter registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use adhoc_core::Config;

use crate::adapter::EngineAdapter;
use crate::adapters::{BigQueryAdapter, TrinoAdapter};

/// Name → adapter map. Lookups happen only after the policy allow-list
/// check, so an engine that is configured but not allow-listed for a caller
/// is never reached.
#[derive(Default)]
pub struct EngineRegistry {
    adapters: HashMap<String, Arc<dyn EngineAdapter>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn EngineAdapter>) {
        info!("Engine adapter registered: {}", adapter.name());
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn EngineAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Build the registry from config. Engines without credentials are simply
/// not registered; requests naming them fail the allow-list/registry check.
pub fn build_registry(config: &Config) -> EngineRegistry {
    let mut registry = EngineRegistry::new();

    if config.bigquery.is_configured() {
        let bq = &config.bigquery;
        registry.register(Arc::new(BigQueryAdapter::new(
            bq.project_id.clone().expect("checked by is_configured"),
            bq.base_url.clone(),
            bq.access_token.clone().expect("checked by is_configured"),
        )));
    } else {
        info!("BigQuery not configured — adapter disabled");
    }

    if config.trino.is_configured() {
        let trino = &config.trino;
        registry.register(Arc::new(TrinoAdapter::new(
            trino.base_url.clone().expect("checked by is_configured"),
            trino.user.clone(),
            trino.catalog.clone(),
            trino.schema.clone(),
        )));
    } else {
        info!("Trino not configured — adapter disabled");
    }

    registry
}
