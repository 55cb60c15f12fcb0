use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use adhoc_core::ExecutionError;

use super::format::{content_type_for, serialize_rows};
use super::types::{DownloadPayload, StoredResult};

/// In-memory TTL store for query results.
///
/// Query ids are generated per execution and never reused, so a plain
/// locked map is enough; concurrent retrievals of the same key are
/// read-only until expiry.
pub struct ResultStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, StoredResult>>,
}

impl ResultStore {
    pub fn new(ttl_hours: u32) -> Self {
        Self {
            ttl: Duration::hours(ttl_hours as i64),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Persist a result set and mint one signed download URL per requested
    /// format. A format whose serialized form exceeds `max_file_bytes` is
    /// skipped (no token, no URL); the others still succeed.
    pub fn store(
        &self,
        query_id: &str,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        formats: &[String],
        max_file_bytes: u64,
    ) -> HashMap<String, String> {
        self.store_at(query_id, columns, rows, formats, max_file_bytes, Utc::now())
    }

    pub(crate) fn store_at(
        &self,
        query_id: &str,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        formats: &[String],
        max_file_bytes: u64,
        now: DateTime<Utc>,
    ) -> HashMap<String, String> {
        let mut tokens: HashMap<String, String> = HashMap::new();
        let mut urls: HashMap<String, String> = HashMap::new();

        for format in formats {
            match serialize_rows(&columns, &rows, format) {
                Ok(bytes) if bytes.len() as u64 > max_file_bytes => {
                    warn!(
                        query_id = %query_id,
                        format = %format,
                        size = bytes.len(),
                        "serialized result exceeds file size limit — format skipped"
                    );
                }
                Ok(_) => {
                    let token = mint_token();
                    urls.insert(
                        format.clone(),
                        format!(
                            "/api/v1/run/results/{}/download?format={}&token={}",
                            query_id, format, token
                        ),
                    );
                    tokens.insert(format.clone(), token);
                }
                Err(e) => {
                    warn!(query_id = %query_id, format = %format, error = %e, "format skipped");
                }
            }
        }

        let expires_at = now + self.ttl;
        let mut entries = self.entries.write().expect("result store lock poisoned");
        entries.insert(
            query_id.to_string(),
            StoredResult {
                columns,
                rows,
                created_at: now,
                expires_at,
                tokens,
            },
        );
        debug!(query_id = %query_id, expires_at = %expires_at, "result stored");

        urls
    }

    /// Serve a stored result in the requested format.
    ///
    /// Expiry is checked before the token so an attacker holding a valid
    /// token for an expired result learns nothing beyond "not found".
    pub fn retrieve(
        &self,
        query_id: &str,
        format: &str,
        token: &str,
    ) -> Result<DownloadPayload, ExecutionError> {
        self.retrieve_at(query_id, format, token, Utc::now())
    }

    pub(crate) fn retrieve_at(
        &self,
        query_id: &str,
        format: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<DownloadPayload, ExecutionError> {
        let mut entries = self.entries.write().expect("result store lock poisoned");

        let Some(entry) = entries.get(query_id) else {
            return Err(ExecutionError::ResultNotFound(query_id.to_string()));
        };

        if entry.expires_at <= now {
            entries.remove(query_id);
            return Err(ExecutionError::ResultNotFound(query_id.to_string()));
        }

        match entry.tokens.get(format) {
            Some(expected) if expected == token => {}
            _ => return Err(ExecutionError::InvalidDownloadToken),
        }

        let content_type = content_type_for(format).ok_or_else(|| {
            ExecutionError::InvalidParameter(format!("unsupported download format '{}'", format))
        })?;
        let bytes = serialize_rows(&entry.columns, &entry.rows, format)?;

        Ok(DownloadPayload {
            bytes,
            content_type,
            filename: format!("result.{}", format),
        })
    }

    /// Evict expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub(crate) fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().expect("result store lock poisoned");
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().expect("result store lock poisoned").len()
    }
}

/// Opaque per-(query, format) download credential: 32 random bytes, hex.
fn mint_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Periodically evict expired results. Correctness does not depend on this
/// task — reads re-check expiry — it only bounds memory.
pub fn spawn_sweeper(store: Arc<ResultStore>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let evicted = store.sweep();
            if evicted > 0 {
                info!("Result sweep evicted {} expired result(s)", evicted);
            }
        }
    });
}
