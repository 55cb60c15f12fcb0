use std::time::Duration;

use async_trait::async_trait;

/// Rows plus execution metrics from one engine call.
#[derive(Debug, Clone)]
pub struct EngineResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub bytes_scanned: Option<i64>,
    pub cost_usd: Option<f64>,
}

/// Trait for query engines — each backend implements this.
///
/// Adapters receive already-rendered SQL and a hard duration ceiling. The
/// ceiling is also enforced externally by the dispatcher, so an adapter that
/// ignores it still cannot hang a request.
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Engine name as it appears in policy allow-lists (e.g. "bigquery").
    fn name(&self) -> &str;

    /// Execute one SQL statement and return all rows.
    async fn execute(&self, sql: &str, timeout: Duration) -> Result<EngineResult, EngineError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} — {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("query failed: {0}")]
    QueryError(String),
}
