//! Execution dispatch: render, dry-run short-circuit, timeout-bounded
//! engine calls, and outcome normalization.
//!
//! Adapter failures (including the duration ceiling) are folded into a
//! `Failed` outcome here and never propagate as errors — the request itself
//! was valid and admitted, only the query failed. Nothing in this module
//! holds a lock across the adapter await, so a slow query cannot stall
//! admission checks for other callers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use adhoc_core::{ExecutionError, ExecutionPolicy};

use crate::registry::EngineRegistry;
use crate::render::render;
use crate::types::{ExecutionOutcome, ExecutionStatus, QueryRequest, ResultData};

/// Outcome plus the raw rows (kept out of the serialized outcome so the
/// coordinator can hand them straight to the result store).
#[derive(Debug)]
pub struct DispatchResult {
    pub outcome: ExecutionOutcome,
    pub data: Option<ResultData>,
}

pub struct ExecutionDispatcher {
    registry: Arc<EngineRegistry>,
}

impl ExecutionDispatcher {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self { registry }
    }

    /// Run one query request under the caller's policy.
    ///
    /// Returns `Err` only for requests that never reach an engine
    /// (disallowed or unregistered engine); everything after admission is a
    /// normal outcome, `Failed` included.
    pub async fn run(
        &self,
        request: &QueryRequest,
        policy: &ExecutionPolicy,
    ) -> Result<DispatchResult, ExecutionError> {
        if !policy.allows_engine(&request.engine) {
            return Err(ExecutionError::EngineNotSupported {
                engine: request.engine.clone(),
                allowed: policy.allowed_engines.iter().cloned().collect(),
            });
        }

        let rendered_sql = render(&request.sql, &request.parameters);

        if request.dry_run {
            return Ok(DispatchResult {
                outcome: ExecutionOutcome {
                    query_id: None,
                    status: ExecutionStatus::Validated,
                    execution_time_seconds: 0.0,
                    rows_returned: 0,
                    bytes_scanned: None,
                    cost_usd: None,
                    rendered_sql,
                    download_format: request.download_format.clone(),
                    truncated: false,
                    error_message: None,
                    download_urls: Default::default(),
                },
                data: None,
            });
        }

        // Allow-listed but not registered (no credentials configured) reads
        // the same to the caller as not allow-listed.
        let Some(adapter) = self.registry.get(&request.engine) else {
            return Err(ExecutionError::EngineNotSupported {
                engine: request.engine.clone(),
                allowed: self.registry.names(),
            });
        };

        let query_id = generate_query_id();
        let ceiling = Duration::from_secs(policy.max_query_duration_seconds);
        let start = std::time::Instant::now();

        let result = tokio::time::timeout(ceiling, adapter.execute(&rendered_sql, ceiling)).await;
        let execution_time_seconds = start.elapsed().as_secs_f64();

        let engine_result = match result {
            Err(_) => {
                warn!(query_id = %query_id, "query exceeded duration ceiling");
                return Ok(DispatchResult {
                    outcome: failed_outcome(
                        query_id,
                        rendered_sql,
                        request,
                        execution_time_seconds,
                        format!(
                            "query timed out after {}s",
                            policy.max_query_duration_seconds
                        ),
                    ),
                    data: None,
                });
            }
            Ok(Err(e)) => {
                warn!(query_id = %query_id, error = %e, "query execution failed");
                return Ok(DispatchResult {
                    outcome: failed_outcome(
                        query_id,
                        rendered_sql,
                        request,
                        execution_time_seconds,
                        e.to_string(),
                    ),
                    data: None,
                });
            }
            Ok(Ok(r)) => r,
        };

        let mut rows = engine_result.rows;
        let truncated = rows.len() > policy.max_result_rows;
        if truncated {
            rows.truncate(policy.max_result_rows);
        }

        Ok(DispatchResult {
            outcome: ExecutionOutcome {
                query_id: Some(query_id),
                status: ExecutionStatus::Completed,
                execution_time_seconds,
                rows_returned: rows.len(),
                bytes_scanned: engine_result.bytes_scanned,
                cost_usd: engine_result.cost_usd,
                rendered_sql,
                download_format: request.download_format.clone(),
                truncated,
                error_message: None,
                download_urls: Default::default(),
            },
            data: Some(ResultData {
                columns: engine_result.columns,
                rows,
            }),
        })
    }
}

fn failed_outcome(
    query_id: String,
    rendered_sql: String,
    request: &QueryRequest,
    execution_time_seconds: f64,
    error_message: String,
) -> ExecutionOutcome {
    ExecutionOutcome {
        query_id: Some(query_id),
        status: ExecutionStatus::Failed,
        execution_time_seconds,
        rows_returned: 0,
        bytes_scanned: None,
        cost_usd: None,
        rendered_sql,
        download_format: request.download_format.clone(),
        truncated: false,
        error_message: Some(error_message),
        download_urls: Default::default(),
    }
}

/// Time-ordered, globally unique query id: `adhoc_{yyyyMMdd}_{HHmmss}_{random8}`.
fn generate_query_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "adhoc_{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use adhoc_core::policy::RateLimits;

    use super::*;
    use crate::adapter::{EngineAdapter, EngineError, EngineResult};

    struct FixedRowsAdapter {
        rows: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EngineAdapter for FixedRowsAdapter {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn execute(
            &self,
            _sql: &str,
            _timeout: Duration,
        ) -> Result<EngineResult, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(EngineResult {
                columns: vec!["n".into()],
                rows: (0..self.rows).map(|i| vec![i.to_string()]).collect(),
                bytes_scanned: Some(1024),
                cost_usd: Some(0.01),
            })
        }
    }

    struct HangingAdapter;

    #[async_trait]
    impl EngineAdapter for HangingAdapter {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn execute(
            &self,
            _sql: &str,
            _timeout: Duration,
        ) -> Result<EngineResult, EngineError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("sleep outlives every test timeout");
        }
    }

    struct FailingAdapter;

    #[async_trait]
    impl EngineAdapter for FailingAdapter {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn execute(
            &self,
            _sql: &str,
            _timeout: Duration,
        ) -> Result<EngineResult, EngineError> {
            Err(EngineError::QueryError("table not found: missing".into()))
        }
    }

    fn test_policy() -> ExecutionPolicy {
        ExecutionPolicy {
            max_query_duration_seconds: 1,
            max_result_rows: 5,
            max_result_size_mb: 100,
            allowed_engines: BTreeSet::from(["fixed".to_string()]),
            allowed_file_types: BTreeSet::from(["csv".to_string()]),
            max_file_size_mb: 100,
            rate_limits: RateLimits {
                queries_per_hour: 10,
                queries_per_day: 100,
            },
        }
    }

    fn request(engine: &str, dry_run: bool) -> QueryRequest {
        QueryRequest {
            sql: "SELECT * FROM t WHERE d = {date}".into(),
            engine: engine.into(),
            parameters: [("date".to_string(), "2026-01-01".to_string())].into(),
            download_format: None,
            dry_run,
        }
    }

    fn dispatcher_with(adapter: Arc<dyn EngineAdapter>) -> ExecutionDispatcher {
        let mut registry = EngineRegistry::new();
        registry.register(adapter);
        ExecutionDispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_disallowed_engine_rejected() {
        let dispatcher = dispatcher_with(Arc::new(FixedRowsAdapter {
            rows: 1,
            calls: AtomicUsize::new(0),
        }));
        let err = dispatcher
            .run(&request("presto", false), &test_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::EngineNotSupported { .. }));
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_adapter() {
        let adapter = Arc::new(FixedRowsAdapter {
            rows: 1,
            calls: AtomicUsize::new(0),
        });
        let dispatcher = dispatcher_with(adapter.clone());

        let result = dispatcher
            .run(&request("fixed", true), &test_policy())
            .await
            .unwrap();

        assert_eq!(result.outcome.status, ExecutionStatus::Validated);
        assert!(result.outcome.query_id.is_none());
        assert_eq!(result.outcome.rows_returned, 0);
        assert_eq!(
            result.outcome.rendered_sql,
            "SELECT * FROM t WHERE d = '2026-01-01'"
        );
        assert!(result.data.is_none());
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_completed_with_row_cap() {
        let dispatcher = dispatcher_with(Arc::new(FixedRowsAdapter {
            rows: 1_000,
            calls: AtomicUsize::new(0),
        }));

        let result = dispatcher
            .run(&request("fixed", false), &test_policy())
            .await
            .unwrap();

        assert_eq!(result.outcome.status, ExecutionStatus::Completed);
        assert_eq!(result.outcome.rows_returned, 5);
        assert!(result.outcome.truncated);
        assert_eq!(result.data.unwrap().rows.len(), 5);
        let query_id = result.outcome.query_id.unwrap();
        assert!(query_id.starts_with("adhoc_"));
    }

    #[tokio::test]
    async fn test_under_cap_not_truncated() {
        let dispatcher = dispatcher_with(Arc::new(FixedRowsAdapter {
            rows: 3,
            calls: AtomicUsize::new(0),
        }));

        let result = dispatcher
            .run(&request("fixed", false), &test_policy())
            .await
            .unwrap();

        assert_eq!(result.outcome.rows_returned, 3);
        assert!(!result.outcome.truncated);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_failed_outcome() {
        let dispatcher = dispatcher_with(Arc::new(HangingAdapter));

        let result = dispatcher
            .run(&request("fixed", false), &test_policy())
            .await
            .unwrap();

        assert_eq!(result.outcome.status, ExecutionStatus::Failed);
        assert!(result
            .outcome
            .error_message
            .as_deref()
            .unwrap()
            .contains("timed out"));
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn test_adapter_error_maps_to_failed_outcome() {
        let dispatcher = dispatcher_with(Arc::new(FailingAdapter));

        let result = dispatcher
            .run(&request("fixed", false), &test_policy())
            .await
            .unwrap();

        assert_eq!(result.outcome.status, ExecutionStatus::Failed);
        assert!(result
            .outcome
            .error_message
            .as_deref()
            .unwrap()
            .contains("table not found"));
    }
}
