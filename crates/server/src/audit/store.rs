use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::types::{DailyCostSummary, QueryLogEntry, QueryLogParams, QueryLogSummary};

/// Per-caller query audit log with file-backed persistence.
///
/// In-memory ring buffer per caller (1000 entries FIFO) with immediate JSON
/// persistence to `{data_dir}/query-log-{caller}.json`.
pub struct QueryAuditLog {
    data_dir: PathBuf,
    entries: RwLock<HashMap<String, VecDeque<QueryLogEntry>>>,
    counters: RwLock<HashMap<String, u64>>,
    pub(crate) max_entries_per_caller: usize,
}

impl QueryAuditLog {
    pub fn new(data_dir: &PathBuf) -> Self {
        Self {
            data_dir: data_dir.clone(),
            entries: RwLock::new(HashMap::new()),
            counters: RwLock::new(HashMap::new()),
            max_entries_per_caller: 1000,
        }
    }

    pub(crate) fn log_path(&self, caller: &str) -> PathBuf {
        // Callers are opaque strings; keep the filename shell-safe.
        let safe: String = caller
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.data_dir.join(format!("query-log-{}.json", safe))
    }

    /// Load existing log from disk for a caller (lazy, on first access).
    fn ensure_loaded(&self, caller: &str) {
        {
            let entries = self.entries.read().expect("audit log lock poisoned");
            if entries.contains_key(caller) {
                return;
            }
        }

        let path = self.log_path(caller);
        let loaded: VecDeque<QueryLogEntry> = if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
                Err(e) => {
                    tracing::warn!("Failed to read audit log {}: {}", path.display(), e);
                    VecDeque::new()
                }
            }
        } else {
            VecDeque::new()
        };

        let max_id = loaded.iter().map(|e| e.entry_id).max().unwrap_or(0);

        let mut entries = self.entries.write().expect("audit log lock poisoned");
        let mut counters = self
            .counters
            .write()
            .expect("audit log counter lock poisoned");
        entries.entry(caller.to_string()).or_insert(loaded);
        counters.entry(caller.to_string()).or_insert(max_id + 1);
    }

    /// Persist current entries for a caller to disk.
    fn persist(&self, caller: &str) {
        let entries = self.entries.read().expect("audit log lock poisoned");
        if let Some(deque) = entries.get(caller) {
            let path = self.log_path(caller);
            match serde_json::to_string_pretty(deque) {
                Ok(json) => {
                    if let Err(e) = std::fs::write(&path, json) {
                        tracing::warn!("Failed to persist audit log to {}: {}", path.display(), e);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to serialize audit log: {}", e);
                }
            }
        }
    }

    /// Append a completed execution. Assigns entry_id and persists to disk
    /// immediately.
    pub fn append(&self, mut entry: QueryLogEntry) {
        let caller = entry.caller.clone();
        self.ensure_loaded(&caller);

        {
            let mut counters = self
                .counters
                .write()
                .expect("audit log counter lock poisoned");
            let counter = counters.entry(caller.clone()).or_insert(1);
            entry.entry_id = *counter;
            *counter += 1;
        }

        {
            let mut entries = self.entries.write().expect("audit log lock poisoned");
            let deque = entries.entry(caller.clone()).or_insert_with(VecDeque::new);
            deque.push_back(entry);
            while deque.len() > self.max_entries_per_caller {
                deque.pop_front();
            }
        }

        self.persist(&caller);
    }

    /// Query log entries with filters, newest first.
    pub fn query(&self, caller: &str, params: &QueryLogParams) -> Vec<QueryLogEntry> {
        self.ensure_loaded(caller);

        let entries = self.entries.read().expect("audit log lock poisoned");
        let Some(deque) = entries.get(caller) else {
            return Vec::new();
        };

        let since: Option<DateTime<Utc>> = params
            .since
            .as_ref()
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());
        let until: Option<DateTime<Utc>> = params
            .until
            .as_ref()
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());
        let limit = params.limit.unwrap_or(100) as usize;

        deque
            .iter()
            .rev() // newest first
            .filter(|e| params.outcome.as_ref().map_or(true, |o| &e.outcome == o))
            .filter(|e| since.map_or(true, |s| e.started_at >= s))
            .filter(|e| until.map_or(true, |u| e.started_at < u))
            .filter(|e| {
                params.sql_contains.as_ref().map_or(true, |needle| {
                    e.sql.to_lowercase().contains(&needle.to_lowercase())
                })
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// Cumulative + daily cost summary for a caller.
    pub fn summary(&self, caller: &str) -> QueryLogSummary {
        self.ensure_loaded(caller);

        let entries = self.entries.read().expect("audit log lock poisoned");
        let Some(deque) = entries.get(caller) else {
            return QueryLogSummary {
                total_queries: 0,
                total_bytes_scanned: 0,
                total_cost_usd: 0.0,
                daily: Vec::new(),
            };
        };

        let mut total_bytes: i64 = 0;
        let mut total_cost: f64 = 0.0;
        // day_str -> (count, bytes, cost, engine_costs)
        let mut daily_map: HashMap<String, (u64, i64, f64, HashMap<String, f64>)> = HashMap::new();

        for entry in deque.iter() {
            total_bytes += entry.bytes_scanned;
            total_cost += entry.estimated_cost_usd;

            let day = entry.started_at.format("%Y-%m-%d").to_string();
            let daily = daily_map
                .entry(day)
                .or_insert_with(|| (0, 0, 0.0, HashMap::new()));
            daily.0 += 1;
            daily.1 += entry.bytes_scanned;
            daily.2 += entry.estimated_cost_usd;
            *daily.3.entry(entry.engine.clone()).or_insert(0.0) += entry.estimated_cost_usd;
        }

        let mut daily_summaries: Vec<DailyCostSummary> = daily_map
            .into_iter()
            .map(|(date, (count, bytes, cost, by_engine))| DailyCostSummary {
                date,
                query_count: count,
                total_bytes_scanned: bytes,
                total_cost_usd: cost,
                by_engine,
            })
            .collect();
        daily_summaries.sort_by(|a, b| b.date.cmp(&a.date)); // newest first

        QueryLogSummary {
            total_queries: deque.len() as u64,
            total_bytes_scanned: total_bytes,
            total_cost_usd: total_cost,
            daily: daily_summaries,
        }
    }

    /// Delete all log entries for a caller (in-memory + disk file).
    pub fn clear(&self, caller: &str) {
        {
            let mut entries = self.entries.write().expect("audit log lock poisoned");
            entries.remove(caller);
        }
        {
            let mut counters = self
                .counters
                .write()
                .expect("audit log counter lock poisoned");
            counters.remove(caller);
        }
        let path = self.log_path(caller);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Failed to remove audit log file {}: {}", path.display(), e);
            }
        }
    }
}
