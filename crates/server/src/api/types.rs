//! Request types for the execution endpoints.

use std::collections::HashMap;

use serde::Deserialize;

use adhoc_engine::QueryRequest;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// SQL template; `{name}` placeholders are substituted from `parameters`.
    pub sql: String,
    /// Engine name; defaults to the configured default engine.
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub download_format: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

impl ExecuteRequest {
    pub fn into_query_request(self, default_engine: &str) -> QueryRequest {
        QueryRequest {
            sql: self.sql,
            engine: self.engine.unwrap_or_else(|| default_engine.to_string()),
            parameters: self.parameters,
            download_format: self.download_format,
            dry_run: self.dry_run,
        }
    }
}
