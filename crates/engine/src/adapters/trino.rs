//! Trino engine adapter.
//!
//! Implements the client half of the Trino statement protocol: submit the
//! statement, then follow `nextUri` until the server reports a terminal
//! state, accumulating row batches along the way.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::adapter::{EngineAdapter, EngineError, EngineResult};

pub struct TrinoAdapter {
    client: reqwest::Client,
    base_url: String,
    user: String,
    catalog: Option<String>,
    schema: Option<String>,
}

impl TrinoAdapter {
    pub fn new(
        base_url: String,
        user: String,
        catalog: Option<String>,
        schema: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            user,
            catalog,
            schema,
        }
    }

    async fn submit(&self, sql: &str) -> Result<serde_json::Value, EngineError> {
        let url = format!("{}/v1/statement", self.base_url);
        debug!("Trino statement to {}", url);

        let mut request = self
            .client
            .post(&url)
            .header("X-Trino-User", &self.user)
            .body(sql.to_string());
        if let Some(ref catalog) = self.catalog {
            request = request.header("X-Trino-Catalog", catalog);
        }
        if let Some(ref schema) = self.schema {
            request = request.header("X-Trino-Schema", schema);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::ApiError { status, body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl EngineAdapter for TrinoAdapter {
    fn name(&self) -> &str {
        "trino"
    }

    async fn execute(&self, sql: &str, timeout: Duration) -> Result<EngineResult, EngineError> {
        let start = std::time::Instant::now();
        let idle_poll = Duration::from_millis(100);

        let mut page = self.submit(sql).await?;
        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut bytes_scanned: Option<i64> = None;

        loop {
            if let Some(error) = page.get("error").filter(|e| !e.is_null()) {
                let message = error["message"].as_str().unwrap_or("unknown error");
                return Err(EngineError::QueryError(message.to_string()));
            }

            if columns.is_empty() {
                if let Some(cols) = page["columns"].as_array() {
                    columns = cols
                        .iter()
                        .map(|c| c["name"].as_str().unwrap_or("").to_string())
                        .collect();
                }
            }

            let mut got_data = false;
            if let Some(data) = page["data"].as_array() {
                got_data = !data.is_empty();
                for row in data {
                    let cells = row
                        .as_array()
                        .map(|vs| vs.iter().map(cell_to_string).collect())
                        .unwrap_or_default();
                    rows.push(cells);
                }
            }

            if let Some(processed) = page["stats"]["processedBytes"].as_i64() {
                bytes_scanned = Some(processed);
            }

            let Some(next_uri) = page["nextUri"].as_str().map(|s| s.to_string()) else {
                break;
            };

            if start.elapsed() > timeout {
                return Err(EngineError::QueryError(format!(
                    "query timed out after {:.0}s",
                    timeout.as_secs_f64()
                )));
            }

            // QUEUED/RUNNING pages carry no data; back off briefly before
            // fetching the next page.
            if !got_data {
                tokio::time::sleep(idle_poll).await;
            }

            let response = self
                .client
                .get(&next_uri)
                .header("X-Trino-User", &self.user)
                .send()
                .await?;
            let status = response.status().as_u16();
            if status != 200 {
                let body = response.text().await.unwrap_or_default();
                return Err(EngineError::ApiError { status, body });
            }
            page = response.json().await?;
        }

        Ok(EngineResult {
            columns,
            rows,
            bytes_scanned,
            // Trino reports no per-query cost.
            cost_usd: None,
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
