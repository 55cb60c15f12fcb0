//! Execution coordinator: the single entry point the API layer calls.
//!
//! Owns no state of its own — it orchestrates the policy store, the
//! dispatcher, and the result store, and returns immutable outcomes.
//! Validation failures reject the request before any state mutation: quota
//! is only reserved once the request is known to be runnable.

use std::sync::Arc;

use tracing::debug;

use adhoc_core::{ExecutionError, ExecutionPolicy};
use adhoc_engine::{DispatchResult, ExecutionDispatcher, ExecutionOutcome, ExecutionStatus, QueryRequest};

use crate::policy::PolicyStore;
use crate::results::{DownloadPayload, ResultStore};

pub struct ExecutionCoordinator {
    policies: Arc<PolicyStore>,
    dispatcher: ExecutionDispatcher,
    results: Arc<ResultStore>,
}

impl ExecutionCoordinator {
    pub fn new(
        policies: Arc<PolicyStore>,
        dispatcher: ExecutionDispatcher,
        results: Arc<ResultStore>,
    ) -> Self {
        Self {
            policies,
            dispatcher,
            results,
        }
    }

    /// Run one query request for a caller.
    ///
    /// Dry runs never reserve quota and never touch the result store. Real
    /// runs reserve quota before dispatch; a quota rejection propagates
    /// without the dispatcher ever being called.
    pub async fn execute(
        &self,
        caller: &str,
        request: QueryRequest,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let policy = self.policies.policy_for(caller);
        validate(&request, &policy)?;

        if !request.dry_run {
            self.policies.check_and_reserve(caller)?;
        }

        let DispatchResult { mut outcome, data } = self.dispatcher.run(&request, &policy).await?;

        if outcome.status == ExecutionStatus::Completed {
            if let (Some(format), Some(data), Some(query_id)) =
                (&request.download_format, data, &outcome.query_id)
            {
                let max_file_bytes = policy.max_file_size_mb * 1024 * 1024;
                outcome.download_urls = self.results.store(
                    query_id,
                    data.columns,
                    data.rows,
                    std::slice::from_ref(format),
                    max_file_bytes,
                );
            }
        }

        Ok(outcome)
    }

    /// Serve a stored result. Not a new query, so no policy check.
    pub fn download(
        &self,
        caller: &str,
        query_id: &str,
        format: &str,
        token: &str,
    ) -> Result<DownloadPayload, ExecutionError> {
        debug!(caller = %caller, query_id = %query_id, format = %format, "download requested");
        self.results.retrieve(query_id, format, token)
    }
}

/// Reject malformed requests before any side effect.
fn validate(request: &QueryRequest, policy: &ExecutionPolicy) -> Result<(), ExecutionError> {
    if request.sql.trim().is_empty() {
        return Err(ExecutionError::InvalidParameter(
            "sql must not be blank".into(),
        ));
    }
    if !policy.allows_engine(&request.engine) {
        return Err(ExecutionError::EngineNotSupported {
            engine: request.engine.clone(),
            allowed: policy.allowed_engines.iter().cloned().collect(),
        });
    }
    if let Some(format) = &request.download_format {
        if !policy.allows_file_type(format) {
            return Err(ExecutionError::InvalidParameter(format!(
                "download format '{}' is not allowed (allowed: {})",
                format,
                policy
                    .allowed_file_types
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};
    use std::time::Duration;

    use async_trait::async_trait;

    use adhoc_core::policy::RateLimits;
    use adhoc_core::QuotaWindow;
    use adhoc_engine::adapter::{EngineAdapter, EngineError, EngineResult};
    use adhoc_engine::EngineRegistry;

    use super::*;

    struct StaticAdapter;

    #[async_trait]
    impl EngineAdapter for StaticAdapter {
        fn name(&self) -> &str {
            "bigquery"
        }

        async fn execute(
            &self,
            _sql: &str,
            _timeout: Duration,
        ) -> Result<EngineResult, EngineError> {
            Ok(EngineResult {
                columns: vec!["v".into()],
                rows: vec![vec!["1".into()], vec!["2".into()]],
                bytes_scanned: Some(2048),
                cost_usd: Some(0.05),
            })
        }
    }

    fn test_policy(per_hour: u32) -> ExecutionPolicy {
        ExecutionPolicy {
            max_query_duration_seconds: 5,
            max_result_rows: 100,
            max_result_size_mb: 100,
            allowed_engines: BTreeSet::from(["bigquery".to_string()]),
            allowed_file_types: BTreeSet::from(["csv".to_string(), "json".to_string()]),
            max_file_size_mb: 100,
            rate_limits: RateLimits {
                queries_per_hour: per_hour,
                queries_per_day: 100,
            },
        }
    }

    fn coordinator(per_hour: u32) -> (tempfile::TempDir, ExecutionCoordinator, Arc<PolicyStore>) {
        let dir = tempfile::tempdir().unwrap();
        let policies = Arc::new(PolicyStore::new(
            &dir.path().to_path_buf(),
            test_policy(per_hour),
        ));
        let mut registry = EngineRegistry::new();
        registry.register(Arc::new(StaticAdapter));
        let dispatcher = ExecutionDispatcher::new(Arc::new(registry));
        let results = Arc::new(ResultStore::new(24));
        let coordinator = ExecutionCoordinator::new(policies.clone(), dispatcher, results);
        (dir, coordinator, policies)
    }

    fn request(dry_run: bool, download_format: Option<&str>) -> QueryRequest {
        QueryRequest {
            sql: "SELECT v FROM t".into(),
            engine: "bigquery".into(),
            parameters: HashMap::new(),
            download_format: download_format.map(String::from),
            dry_run,
        }
    }

    #[tokio::test]
    async fn test_quota_of_one_admits_exactly_one() {
        let (_dir, coordinator, _) = coordinator(1);

        let outcome = coordinator
            .execute("alice", request(false, None))
            .await
            .unwrap();
        assert_eq!(outcome.status, ExecutionStatus::Completed);

        let err = coordinator
            .execute("alice", request(false, None))
            .await
            .unwrap_err();
        match err {
            ExecutionError::RateLimitExceeded {
                limit_type,
                limit,
                current_usage,
                ..
            } => {
                assert_eq!(limit_type, QuotaWindow::QueriesPerHour);
                assert_eq!(limit, 1);
                assert_eq!(current_usage, 1);
            }
            other => panic!("expected RateLimitExceeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dry_run_is_side_effect_free() {
        let (_dir, coordinator, policies) = coordinator(1);

        let outcome = coordinator
            .execute("bob", request(true, Some("csv")))
            .await
            .unwrap();

        assert_eq!(outcome.status, ExecutionStatus::Validated);
        assert!(outcome.query_id.is_none());
        assert!(outcome.download_urls.is_empty());

        // No quota consumed: a real run still fits in the 1/hour budget.
        let snapshot = policies.get_policy("bob");
        assert_eq!(snapshot.usage.queries_this_hour, 0);
        coordinator
            .execute("bob", request(false, None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_completed_run_with_format_attaches_download_url() {
        let (_dir, coordinator, _) = coordinator(10);

        let outcome = coordinator
            .execute("carol", request(false, Some("csv")))
            .await
            .unwrap();

        assert_eq!(outcome.status, ExecutionStatus::Completed);
        let url = outcome.download_urls.get("csv").expect("csv url");
        let query_id = outcome.query_id.unwrap();
        assert!(url.contains(&query_id));

        // The minted URL round-trips through download().
        let token = url.split("token=").nth(1).unwrap();
        let payload = coordinator
            .download("carol", &query_id, "csv", token)
            .unwrap();
        assert_eq!(payload.content_type, "text/csv");
        assert_eq!(
            String::from_utf8(payload.bytes).unwrap(),
            "v\n1\n2\n"
        );

        let err = coordinator
            .download("carol", &query_id, "csv", "wrong")
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidDownloadToken));
    }

    #[tokio::test]
    async fn test_no_format_requested_stores_nothing() {
        let (_dir, coordinator, _) = coordinator(10);

        let outcome = coordinator
            .execute("dave", request(false, None))
            .await
            .unwrap();
        let query_id = outcome.query_id.unwrap();

        let err = coordinator
            .download("dave", &query_id, "csv", "any")
            .unwrap_err();
        assert!(matches!(err, ExecutionError::ResultNotFound(_)));
    }

    #[tokio::test]
    async fn test_blank_sql_rejected_without_quota_use() {
        let (_dir, coordinator, policies) = coordinator(1);

        let mut bad = request(false, None);
        bad.sql = "   ".into();
        let err = coordinator.execute("erin", bad).await.unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidParameter(_)));

        assert_eq!(policies.get_policy("erin").usage.queries_this_hour, 0);
    }

    #[tokio::test]
    async fn test_disallowed_engine_rejected_without_quota_use() {
        let (_dir, coordinator, policies) = coordinator(1);

        let mut bad = request(false, None);
        bad.engine = "presto".into();
        let err = coordinator.execute("frank", bad).await.unwrap_err();
        assert!(matches!(err, ExecutionError::EngineNotSupported { .. }));

        assert_eq!(policies.get_policy("frank").usage.queries_this_hour, 0);
    }

    #[tokio::test]
    async fn test_disallowed_download_format_rejected() {
        let (_dir, coordinator, _) = coordinator(10);

        let err = coordinator
            .execute("grace", request(false, Some("parquet")))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidParameter(_)));
    }
}
