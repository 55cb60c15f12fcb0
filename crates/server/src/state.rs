//! Shared application state.

use std::sync::Arc;

use adhoc_core::Config;
use adhoc_engine::{build_registry, EngineRegistry, ExecutionDispatcher};

use crate::audit::QueryAuditLog;
use crate::coordinator::ExecutionCoordinator;
use crate::policy::PolicyStore;
use crate::results::ResultStore;

pub struct AppState {
    pub config: Config,
    pub coordinator: ExecutionCoordinator,
    pub policies: Arc<PolicyStore>,
    pub results: Arc<ResultStore>,
    pub audit: Arc<QueryAuditLog>,
    /// Engine names with a registered adapter, captured at startup.
    pub engines: Vec<String>,
}

/// Build `AppState` with adapters from config.
pub fn build_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let registry = Arc::new(build_registry(&config));
    build_state_with(config, registry)
}

/// Build `AppState` around an explicit registry (tests inject fakes here).
pub(crate) fn build_state_with(
    config: Config,
    registry: Arc<EngineRegistry>,
) -> anyhow::Result<Arc<AppState>> {
    std::fs::create_dir_all(&config.storage.data_dir)?;

    let engines = registry.names();
    let policies = Arc::new(PolicyStore::new(
        &config.storage.data_dir,
        config.policy.to_policy(),
    ));
    let results = Arc::new(ResultStore::new(config.storage.result_ttl_hours));
    let audit = Arc::new(QueryAuditLog::new(&config.storage.data_dir));

    let dispatcher = ExecutionDispatcher::new(registry);
    let coordinator = ExecutionCoordinator::new(policies.clone(), dispatcher, results.clone());

    Ok(Arc::new(AppState {
        config,
        coordinator,
        policies,
        results,
        audit,
        engines,
    }))
}
