//! HTTP router construction.
//!
//! Assembles all Axum routes, the CORS layer, and the OpenAPI docs into a
//! single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.server.cors_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origin = state
            .config
            .server
            .cors_origin
            .parse::<HeaderValue>()
            .expect("valid CORS_ORIGIN header value");
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(api::health))
        .route("/api/v1/run/policy", get(api::run_policy))
        .route("/api/v1/run/execute", post(api::execute_query))
        .route(
            "/api/v1/run/results/{query_id}/download",
            get(api::download_result),
        )
        .route("/api/v1/run/history", get(api::query_history))
        .merge(Scalar::with_url("/docs", api::ApiDoc::openapi()))
        .layer(cors)
        .with_state(state)
}
