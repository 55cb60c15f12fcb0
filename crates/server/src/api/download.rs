//! Result download endpoint.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;

use super::{caller_from_headers, error_response, ApiError};

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub format: String,
    pub token: String,
}

/// Download a stored query result
///
/// The token must be the one minted for this `(query_id, format)` pair at
/// store time. Expired results are gone regardless of the token.
#[utoipa::path(
    get,
    path = "/api/v1/run/results/{query_id}/download",
    tag = "Execution",
    params(
        ("query_id" = String, Path, description = "Query id from the execution outcome"),
        ("format" = String, Query, description = "Download format (csv, tsv, json)"),
        ("token" = String, Query, description = "Download token from the signed URL"),
    ),
    responses(
        (status = 200, description = "Raw result bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Token mismatch", body = ApiError),
        (status = 404, description = "Unknown or expired query id", body = ApiError)
    )
)]
pub async fn download_result(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(query_id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<axum::response::Response, (StatusCode, Json<ApiError>)> {
    let caller = caller_from_headers(&headers);
    let payload = state
        .coordinator
        .download(&caller, &query_id, &params.format, &params.token)
        .map_err(error_response)?;

    Ok(axum::response::Response::builder()
        .status(200)
        .header("Content-Type", payload.content_type)
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", payload.filename),
        )
        .header("Content-Length", payload.bytes.len().to_string())
        .body(axum::body::Body::from(payload.bytes))
        .unwrap())
}
