use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which quota window a rejected reservation ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaWindow {
    QueriesPerHour,
    QueriesPerDay,
}

impl std::fmt::Display for QuotaWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaWindow::QueriesPerHour => write!(f, "queries_per_hour"),
            QuotaWindow::QueriesPerDay => write!(f, "queries_per_day"),
        }
    }
}

/// Closed error taxonomy for the execution gateway.
///
/// Every variant is a rejection of one request, never process-fatal. The API
/// layer owns the enum-to-status-code mapping; nothing in here knows about
/// HTTP. Adapter failures do not appear — the dispatcher folds those into a
/// `Failed` outcome instead of an error.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("query engine '{engine}' is not allowed (allowed: {})", .allowed.join(", "))]
    EngineNotSupported { engine: String, allowed: Vec<String> },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{limit_type} limit of {limit} exceeded (current usage: {current_usage}, resets at {reset_at})")]
    RateLimitExceeded {
        limit_type: QuotaWindow,
        limit: u32,
        current_usage: u32,
        reset_at: DateTime<Utc>,
    },

    #[error("download token does not match")]
    InvalidDownloadToken,

    #[error("result not found: {0}")]
    ResultNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}
