//! Domain-focused API endpoint modules.
//!
//! Shared wire types, the caller-identity extractor, and the single
//! error-to-status-code mapping live here in mod.rs; each sub-module owns
//! one endpoint area.

mod doc;
mod download;
mod execute;
mod health;
mod history;
mod policy;
mod types;


use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use adhoc_core::ExecutionError;

pub use doc::ApiDoc;
pub use download::download_result;
pub use execute::execute_query;
pub use health::health;
pub use history::query_history;
pub use policy::run_policy;
pub use types::ExecuteRequest;

// ── Shared types ─────────────────────────────────────────────────

/// Error body shared by all endpoints. Quota rejections additionally carry
/// the back-off fields so clients can retry at the right time.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<DateTime<Utc>>,
}

impl ApiError {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            limit_type: None,
            limit: None,
            current_usage: None,
            reset_at: None,
        }
    }
}

// ── Error mapping ────────────────────────────────────────────────

/// The one place where the error taxonomy turns into HTTP status codes.
pub(crate) fn error_response(err: ExecutionError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        ExecutionError::EngineNotSupported { .. }
        | ExecutionError::InvalidParameter(_)
        | ExecutionError::InvalidDownloadToken => StatusCode::BAD_REQUEST,
        ExecutionError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        ExecutionError::ResultNotFound(_) => StatusCode::NOT_FOUND,
        ExecutionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut body = ApiError::message(err.to_string());
    if let ExecutionError::RateLimitExceeded {
        limit_type,
        limit,
        current_usage,
        reset_at,
    } = &err
    {
        body.limit_type = Some(limit_type.to_string());
        body.limit = Some(*limit);
        body.current_usage = Some(*current_usage);
        body.reset_at = Some(*reset_at);
    }

    (status, Json(body))
}

// ── Caller identity ──────────────────────────────────────────────

/// Caller identity as resolved by the upstream auth layer. The gateway
/// treats it as an opaque string.
pub(crate) fn caller_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-caller-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}
