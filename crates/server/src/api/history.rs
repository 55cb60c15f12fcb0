//! Query audit history endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::audit::{QueryLogParams, QueryLogResponse};
use crate::state::AppState;

use super::caller_from_headers;

/// Get the caller's query history
///
/// Returns matching audit entries (newest first) with cumulative and daily
/// cost summaries. Supports filtering by outcome, time range, SQL text, and
/// result limit.
#[utoipa::path(
    get,
    path = "/api/v1/run/history",
    tag = "Execution",
    params(
        ("outcome" = Option<String>, Query, description = "Filter by outcome (completed, failed)"),
        ("since" = Option<String>, Query, description = "ISO 8601 lower bound (inclusive)"),
        ("until" = Option<String>, Query, description = "ISO 8601 upper bound (exclusive)"),
        ("limit" = Option<u32>, Query, description = "Maximum entries to return (default 100)"),
        ("sql_contains" = Option<String>, Query, description = "Case-insensitive SQL substring match"),
    ),
    responses(
        (status = 200, description = "Audit entries with cost summary", body = Object)
    )
)]
pub async fn query_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<QueryLogParams>,
) -> Json<QueryLogResponse> {
    let caller = caller_from_headers(&headers);
    let entries = state.audit.query(&caller, &params);
    let summary = state.audit.summary(&caller);

    Json(QueryLogResponse {
        caller,
        entries,
        summary,
    })
}
