use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// One stored result set, keyed by query id in the store.
#[derive(Debug, Clone)]
pub(crate) struct StoredResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// format → download token minted at store time.
    pub tokens: HashMap<String, String>,
}

/// Raw download bytes plus the response metadata the API layer needs.
#[derive(Debug)]
pub struct DownloadPayload {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}
