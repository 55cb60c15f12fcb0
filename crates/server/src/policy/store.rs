use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use adhoc_core::{ExecutionError, ExecutionPolicy, QuotaWindow};

use super::types::{
    next_day, next_hour, PolicySnapshot, RateLimitsView, UsageCounter, UsageSnapshot,
};

/// Static per-caller policies plus live usage counters.
///
/// Policies are loaded lazily from `{data_dir}/policies.json` (a map of
/// caller id to policy); callers without an entry get the default policy.
/// Counters never touch disk — quota windows are short enough that a restart
/// forgiving the current hour is acceptable.
pub struct PolicyStore {
    data_dir: PathBuf,
    default_policy: ExecutionPolicy,
    policies: RwLock<Option<HashMap<String, ExecutionPolicy>>>,
    counters: RwLock<HashMap<String, Arc<Mutex<UsageCounter>>>>,
}

impl PolicyStore {
    pub fn new(data_dir: &PathBuf, default_policy: ExecutionPolicy) -> Self {
        Self {
            data_dir: data_dir.clone(),
            default_policy,
            policies: RwLock::new(None),
            counters: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn policies_path(&self) -> PathBuf {
        self.data_dir.join("policies.json")
    }

    /// Load the policy file on first access.
    fn ensure_policies_loaded(&self) {
        {
            let policies = self.policies.read().expect("policy lock poisoned");
            if policies.is_some() {
                return;
            }
        }

        let path = self.policies_path();
        let loaded: HashMap<String, ExecutionPolicy> = if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(map) => map,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", path.display(), e);
                        HashMap::new()
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        let mut policies = self.policies.write().expect("policy lock poisoned");
        policies.get_or_insert(loaded);
    }

    /// The effective policy for a caller (file entry or default).
    pub fn policy_for(&self, caller: &str) -> ExecutionPolicy {
        self.ensure_policies_loaded();
        let policies = self.policies.read().expect("policy lock poisoned");
        policies
            .as_ref()
            .and_then(|map| map.get(caller))
            .cloned()
            .unwrap_or_else(|| self.default_policy.clone())
    }

    /// Static policy plus current usage. Never mutates counters.
    pub fn get_policy(&self, caller: &str) -> PolicySnapshot {
        self.get_policy_at(caller, Utc::now())
    }

    pub(crate) fn get_policy_at(&self, caller: &str, now: DateTime<Utc>) -> PolicySnapshot {
        let policy = self.policy_for(caller);
        let (queries_this_hour, queries_today) = {
            let counters = self.counters.read().expect("counter map lock poisoned");
            match counters.get(caller) {
                Some(counter) => {
                    let counter = counter.lock().expect("usage counter lock poisoned");
                    (counter.hour_count_at(now), counter.day_count_at(now))
                }
                None => (0, 0),
            }
        };

        PolicySnapshot {
            caller: caller.to_string(),
            max_query_duration_seconds: policy.max_query_duration_seconds,
            max_result_rows: policy.max_result_rows,
            max_result_size_mb: policy.max_result_size_mb,
            allowed_engines: policy.allowed_engines.iter().cloned().collect(),
            allowed_file_types: policy.allowed_file_types.iter().cloned().collect(),
            max_file_size_mb: policy.max_file_size_mb,
            rate_limits: RateLimitsView {
                queries_per_hour: policy.rate_limits.queries_per_hour,
                queries_per_day: policy.rate_limits.queries_per_day,
            },
            usage: UsageSnapshot {
                queries_this_hour,
                queries_today,
            },
        }
    }

    /// Atomically reserve one query against both quota windows.
    ///
    /// Window rollover, the limit checks, and the increments all happen
    /// under the caller's counter lock, so two concurrent requests from the
    /// same caller can never both pass a check only one should. A rejection
    /// increments nothing.
    pub fn check_and_reserve(&self, caller: &str) -> Result<(), ExecutionError> {
        self.check_and_reserve_at(caller, Utc::now())
    }

    pub(crate) fn check_and_reserve_at(
        &self,
        caller: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ExecutionError> {
        let policy = self.policy_for(caller);
        let counter = self.counter_for(caller, now);
        let mut counter = counter.lock().expect("usage counter lock poisoned");

        counter.roll(now);

        let limits = &policy.rate_limits;
        if counter.queries_this_hour >= limits.queries_per_hour {
            return Err(ExecutionError::RateLimitExceeded {
                limit_type: QuotaWindow::QueriesPerHour,
                limit: limits.queries_per_hour,
                current_usage: counter.queries_this_hour,
                reset_at: next_hour(counter.hour_window),
            });
        }
        if counter.queries_today >= limits.queries_per_day {
            return Err(ExecutionError::RateLimitExceeded {
                limit_type: QuotaWindow::QueriesPerDay,
                limit: limits.queries_per_day,
                current_usage: counter.queries_today,
                reset_at: next_day(counter.day_window),
            });
        }

        counter.queries_this_hour += 1;
        counter.queries_today += 1;
        Ok(())
    }

    /// Get or create the caller's counter cell. Read-lock fast path; the
    /// write lock is only taken the first time a caller shows up.
    fn counter_for(&self, caller: &str, now: DateTime<Utc>) -> Arc<Mutex<UsageCounter>> {
        {
            let counters = self.counters.read().expect("counter map lock poisoned");
            if let Some(counter) = counters.get(caller) {
                return counter.clone();
            }
        }
        let mut counters = self.counters.write().expect("counter map lock poisoned");
        counters
            .entry(caller.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UsageCounter::new(now))))
            .clone()
    }
}
