use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::policy::{ExecutionPolicy, RateLimits};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Parse a comma-separated env var into a sorted set.
fn env_set(key: &str, default: &str) -> BTreeSet<String> {
    env_or(key, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub policy: PolicyDefaults,
    pub bigquery: BigQueryConfig,
    pub trino: TrinoConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            storage: StorageConfig::from_env(),
            policy: PolicyDefaults::from_env(),
            bigquery: BigQueryConfig::from_env(),
            trino: TrinoConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:    port={}", self.server.port);
        tracing::info!(
            "  storage:   data_dir={}, result_ttl={}h",
            self.storage.data_dir.display(),
            self.storage.result_ttl_hours
        );
        tracing::info!(
            "  policy:    default engines={:?}, {}/h {}/day",
            self.policy.allowed_engines,
            self.policy.queries_per_hour,
            self.policy.queries_per_day
        );
        tracing::info!(
            "  bigquery:  project={}, configured={}",
            self.bigquery.project_id.as_deref().unwrap_or("(none)"),
            self.bigquery.is_configured()
        );
        tracing::info!(
            "  trino:     url={}, configured={}",
            self.trino.base_url.as_deref().unwrap_or("(none)"),
            self.trino.is_configured()
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_u16("PORT", 3001),
            cors_origin: env_or("CORS_ORIGIN", "*"),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// How long stored query results stay downloadable.
    pub result_ttl_hours: u32,
    /// Interval between background sweeps of expired results.
    pub sweep_interval_seconds: u64,
}

impl StorageConfig {
    fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            result_ttl_hours: env_u32("RESULT_TTL_HOURS", 24),
            sweep_interval_seconds: env_u64("RESULT_SWEEP_INTERVAL_SECONDS", 300),
        }
    }
}

// ── Policy defaults ───────────────────────────────────────────

/// Fallback policy for callers without an entry in `policies.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDefaults {
    pub max_query_duration_seconds: u64,
    pub max_result_rows: usize,
    pub max_result_size_mb: u64,
    pub allowed_engines: BTreeSet<String>,
    pub allowed_file_types: BTreeSet<String>,
    pub max_file_size_mb: u64,
    pub queries_per_hour: u32,
    pub queries_per_day: u32,
    /// Engine used when a request does not name one.
    pub default_engine: String,
}

impl PolicyDefaults {
    fn from_env() -> Self {
        Self {
            max_query_duration_seconds: env_u64("POLICY_MAX_QUERY_DURATION_SECONDS", 300),
            max_result_rows: env_u32("POLICY_MAX_RESULT_ROWS", 10_000) as usize,
            max_result_size_mb: env_u64("POLICY_MAX_RESULT_SIZE_MB", 100),
            allowed_engines: env_set("POLICY_ALLOWED_ENGINES", "bigquery,trino"),
            allowed_file_types: env_set("POLICY_ALLOWED_FILE_TYPES", "csv,tsv,json"),
            max_file_size_mb: env_u64("POLICY_MAX_FILE_SIZE_MB", 100),
            queries_per_hour: env_u32("POLICY_QUERIES_PER_HOUR", 20),
            queries_per_day: env_u32("POLICY_QUERIES_PER_DAY", 100),
            default_engine: env_or("POLICY_DEFAULT_ENGINE", "bigquery"),
        }
    }

    pub fn to_policy(&self) -> ExecutionPolicy {
        ExecutionPolicy {
            max_query_duration_seconds: self.max_query_duration_seconds,
            max_result_rows: self.max_result_rows,
            max_result_size_mb: self.max_result_size_mb,
            allowed_engines: self.allowed_engines.clone(),
            allowed_file_types: self.allowed_file_types.clone(),
            max_file_size_mb: self.max_file_size_mb,
            rate_limits: RateLimits {
                queries_per_hour: self.queries_per_hour,
                queries_per_day: self.queries_per_day,
            },
        }
    }
}

// ── BigQuery ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigQueryConfig {
    pub project_id: Option<String>,
    pub base_url: String,
    pub access_token: Option<String>,
}

impl BigQueryConfig {
    fn from_env() -> Self {
        Self {
            project_id: env_opt("BIGQUERY_PROJECT_ID"),
            base_url: env_or("BIGQUERY_BASE_URL", "https://bigquery.googleapis.com"),
            access_token: env_opt("BIGQUERY_ACCESS_TOKEN"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.project_id.is_some() && self.access_token.is_some()
    }
}

// ── Trino ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrinoConfig {
    pub base_url: Option<String>,
    pub user: String,
    pub catalog: Option<String>,
    pub schema: Option<String>,
}

impl TrinoConfig {
    fn from_env() -> Self {
        Self {
            base_url: env_opt("TRINO_BASE_URL"),
            user: env_or("TRINO_USER", "adhoc-gateway"),
            catalog: env_opt("TRINO_CATALOG"),
            schema: env_opt("TRINO_SCHEMA"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }
}
