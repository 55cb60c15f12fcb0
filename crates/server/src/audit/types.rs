use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state of an audited execution. Dry runs are never logged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Completed,
    Failed,
}

/// A single audited query execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogEntry {
    /// Monotonic counter scoped to the caller.
    pub entry_id: u64,
    pub caller: String,
    pub query_id: Option<String>,
    pub engine: String,
    /// Rendered SQL as sent to the engine.
    pub sql: String,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub rows_returned: u64,
    pub bytes_scanned: i64,
    pub estimated_cost_usd: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub wall_clock_ms: i64,
}

/// Query-string parameters for `GET /api/v1/run/history`.
#[derive(Debug, Default, Deserialize)]
pub struct QueryLogParams {
    pub outcome: Option<AuditOutcome>,
    /// ISO 8601 lower bound (inclusive).
    pub since: Option<String>,
    /// ISO 8601 upper bound (exclusive).
    pub until: Option<String>,
    /// Maximum entries to return (default 100).
    pub limit: Option<u32>,
    /// Case-insensitive substring match against the SQL text.
    pub sql_contains: Option<String>,
}

/// Cost breakdown for a single calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct DailyCostSummary {
    /// `YYYY-MM-DD` formatted date.
    pub date: String,
    pub query_count: u64,
    pub total_bytes_scanned: i64,
    pub total_cost_usd: f64,
    /// Cost keyed by engine name.
    pub by_engine: HashMap<String, f64>,
}

/// Aggregated statistics across all of a caller's log entries.
#[derive(Debug, Serialize)]
pub struct QueryLogSummary {
    pub total_queries: u64,
    pub total_bytes_scanned: i64,
    pub total_cost_usd: f64,
    pub daily: Vec<DailyCostSummary>,
}

/// Top-level API response wrapping entries and their summary.
#[derive(Debug, Serialize)]
pub struct QueryLogResponse {
    pub caller: String,
    pub entries: Vec<QueryLogEntry>,
    pub summary: QueryLogSummary,
}
