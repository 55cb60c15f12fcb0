//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

use super::{download, execute, health, history, policy};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ad-hoc SQL Gateway API",
        version = "0.1.0",
        description = "Policy-governed ad-hoc SQL execution against allow-listed query engines, with quota enforcement and token-gated result downloads.",
    ),
    tags(
        (name = "Health", description = "Server readiness and registered engines"),
        (name = "Execution", description = "Ad-hoc query execution, policy/usage, result downloads, and audit history"),
    ),
    paths(
        health::health,
        policy::run_policy,
        execute::execute_query,
        download::download_result,
        history::query_history,
    ),
    components(schemas(
        super::ApiError,
        super::types::ExecuteRequest,
        health::HealthResponse,
    ))
)]
pub struct ApiDoc;
