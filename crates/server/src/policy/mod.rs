//! Per-caller execution policy and admission control.
//!
//! Static policies come from `{data_dir}/policies.json` (with a config
//! default for unknown callers); live usage counters are in-memory, one per
//! caller, behind a per-caller mutex so admission checks for one caller
//! never serialize against another's.

mod store;
mod types;

#[cfg(test)]
mod tests;

pub use store::PolicyStore;
pub use types::{PolicySnapshot, RateLimitsView, UsageSnapshot};
