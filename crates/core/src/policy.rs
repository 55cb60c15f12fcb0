//! Per-caller execution policy.
//!
//! The policy is static configuration: what a caller may run, where, and how
//! much. Live usage counters live with the policy store in the server crate;
//! this type is the file-backed/config-backed half.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Quota limits for the rolling admission windows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RateLimits {
    pub queries_per_hour: u32,
    pub queries_per_day: u32,
}

/// Everything a caller is allowed to do, as loaded from `policies.json` or
/// defaulted from config for unknown callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionPolicy {
    pub max_query_duration_seconds: u64,
    pub max_result_rows: usize,
    pub max_result_size_mb: u64,
    pub allowed_engines: BTreeSet<String>,
    pub allowed_file_types: BTreeSet<String>,
    pub max_file_size_mb: u64,
    pub rate_limits: RateLimits,
}

impl ExecutionPolicy {
    pub fn allows_engine(&self, engine: &str) -> bool {
        self.allowed_engines.contains(engine)
    }

    pub fn allows_file_type(&self, file_type: &str) -> bool {
        self.allowed_file_types.contains(file_type)
    }
}
