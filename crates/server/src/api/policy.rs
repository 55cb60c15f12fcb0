//! Caller policy and usage endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::policy::PolicySnapshot;
use crate::state::AppState;

use super::caller_from_headers;

/// Get the caller's execution policy and current usage
///
/// Read-only: reporting usage never consumes quota.
#[utoipa::path(
    get,
    path = "/api/v1/run/policy",
    tag = "Execution",
    responses(
        (status = 200, description = "Policy limits plus current hourly/daily usage", body = Object)
    )
)]
pub async fn run_policy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<PolicySnapshot> {
    let caller = caller_from_headers(&headers);
    Json(state.policies.get_policy(&caller))
}
