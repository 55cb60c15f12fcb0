//! Query cost estimation.

/// BigQuery on-demand pricing: $6.25 per TiB scanned, 10 MiB minimum billed
/// per query. Metadata-only queries (`bytes_scanned == 0`) are free.
const BIGQUERY_COST_PER_BYTE: f64 = 6.25 / (1024.0 * 1024.0 * 1024.0 * 1024.0);
const BIGQUERY_MIN_SCAN_BYTES: i64 = 10 * 1024 * 1024; // 10 MiB

/// Return the estimated USD cost for a BigQuery query that scanned
/// `bytes_scanned` bytes.
pub fn bigquery_query_cost(bytes_scanned: i64) -> f64 {
    if bytes_scanned == 0 {
        return 0.0;
    }
    let billable = bytes_scanned.max(BIGQUERY_MIN_SCAN_BYTES);
    billable as f64 * BIGQUERY_COST_PER_BYTE
}
