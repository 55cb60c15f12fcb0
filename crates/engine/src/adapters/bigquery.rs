//! BigQuery engine adapter.
//!
//! Speaks the `jobs.query` REST endpoint directly: one synchronous query
//! call with an engine-side timeout, no job polling. Row cells come back as
//! the stringly-typed `f`/`v` structure, which maps cleanly onto the
//! gateway's string-cell row model.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::adapter::{EngineAdapter, EngineError, EngineResult};
use crate::cost::bigquery_query_cost;

pub struct BigQueryAdapter {
    client: reqwest::Client,
    project_id: String,
    base_url: String,
    access_token: String,
}

impl BigQueryAdapter {
    pub fn new(project_id: String, base_url: String, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id,
            base_url,
            access_token,
        }
    }
}

#[async_trait]
impl EngineAdapter for BigQueryAdapter {
    fn name(&self) -> &str {
        "bigquery"
    }

    async fn execute(&self, sql: &str, timeout: Duration) -> Result<EngineResult, EngineError> {
        let url = format!(
            "{}/bigquery/v2/projects/{}/queries",
            self.base_url, self.project_id
        );

        let body = json!({
            "query": sql,
            "useLegacySql": false,
            "timeoutMs": timeout.as_millis() as u64,
        });

        debug!("BigQuery request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::ApiError { status, body });
        }

        let resp: serde_json::Value = response.json().await?;

        if !resp["jobComplete"].as_bool().unwrap_or(false) {
            return Err(EngineError::QueryError(
                "query did not complete within the engine-side timeout".into(),
            ));
        }

        let columns: Vec<String> = resp["schema"]["fields"]
            .as_array()
            .ok_or_else(|| EngineError::ParseError("missing schema.fields".into()))?
            .iter()
            .map(|f| f["name"].as_str().unwrap_or("").to_string())
            .collect();

        let rows: Vec<Vec<String>> = resp["rows"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row["f"]
                            .as_array()
                            .map(|cells| cells.iter().map(|c| cell_to_string(&c["v"])).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();

        let bytes_scanned = resp["totalBytesProcessed"]
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| resp["totalBytesProcessed"].as_i64());

        Ok(EngineResult {
            columns,
            rows,
            cost_usd: bytes_scanned.map(bigquery_query_cost),
            bytes_scanned,
        })
    }
}

fn cell_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
