//! Ad-hoc SQL execution endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;

use adhoc_engine::{ExecutionOutcome, ExecutionStatus};

use crate::audit::{AuditOutcome, QueryLogEntry};
use crate::state::AppState;

use super::types::ExecuteRequest;
use super::{caller_from_headers, error_response, ApiError};

/// Execute an ad-hoc SQL query
///
/// Renders the SQL template, checks the caller's quota (real runs only),
/// executes against the selected engine, and — when a download format was
/// requested — stores the result and returns signed download URLs.
///
/// A query that was admitted but failed at the engine comes back as a 200
/// with `status = "FAILED"`; only requests rejected before execution map to
/// error status codes.
#[utoipa::path(
    post,
    path = "/api/v1/run/execute",
    tag = "Execution",
    request_body = ExecuteRequest,
    responses(
        (status = 200, description = "Execution outcome (VALIDATED, COMPLETED, or FAILED)", body = Object),
        (status = 400, description = "Engine not allowed, blank SQL, or bad download format", body = ApiError),
        (status = 429, description = "Hourly or daily quota exceeded", body = ApiError)
    )
)]
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecutionOutcome>, (StatusCode, Json<ApiError>)> {
    let caller = caller_from_headers(&headers);
    let request = req.into_query_request(&state.config.policy.default_engine);
    let dry_run = request.dry_run;
    let engine = request.engine.clone();

    let started_at = Utc::now();
    let wall_start = std::time::Instant::now();

    let outcome = state
        .coordinator
        .execute(&caller, request)
        .await
        .map_err(error_response)?;

    // Dry runs are side-effect-free and stay out of the audit log.
    if !dry_run {
        state.audit.append(QueryLogEntry {
            entry_id: 0,
            caller: caller.clone(),
            query_id: outcome.query_id.clone(),
            engine,
            sql: outcome.rendered_sql.clone(),
            outcome: match outcome.status {
                ExecutionStatus::Failed => AuditOutcome::Failed,
                _ => AuditOutcome::Completed,
            },
            error_message: outcome.error_message.clone(),
            rows_returned: outcome.rows_returned as u64,
            bytes_scanned: outcome.bytes_scanned.unwrap_or(0),
            estimated_cost_usd: outcome.cost_usd.unwrap_or(0.0),
            started_at,
            completed_at: Utc::now(),
            wall_clock_ms: wall_start.elapsed().as_millis() as i64,
        });
    }

    Ok(Json(outcome))
}
