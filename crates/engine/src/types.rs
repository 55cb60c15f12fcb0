//! Request and outcome types for the execution pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single ad-hoc query submission, after the API layer has applied
/// defaults. `sql` is the raw template; rendering happens in the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    pub engine: String,
    pub parameters: HashMap<String, String>,
    pub download_format: Option<String>,
    pub dry_run: bool,
}

/// Terminal state of one `execute()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Dry run: rendered and admission-checked, never sent to an engine.
    Validated,
    Completed,
    Failed,
}

/// What one `execute()` call produced. Created once, immutable thereafter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    /// Absent for dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    pub status: ExecutionStatus,
    pub execution_time_seconds: f64,
    pub rows_returned: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_scanned: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    pub rendered_sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_format: Option<String>,
    /// True when the engine returned more rows than the policy row cap.
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Signed download URLs, one per stored format. Attached by the
    /// coordinator after a successful store; empty otherwise.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub download_urls: HashMap<String, String>,
}

/// Result rows held back from the outcome so the coordinator can hand them
/// to the result store without round-tripping through serialization.
#[derive(Debug, Clone)]
pub struct ResultData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
