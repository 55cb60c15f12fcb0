//! Ephemeral, token-gated result storage.
//!
//! Results live under their query id for a fixed TTL. A download token is
//! minted per `(query_id, format)` pair at store time and must match on
//! retrieval. Expiry is enforced unconditionally at read time; the
//! background sweep only reclaims memory earlier.

mod format;
mod store;
mod types;


pub use store::{spawn_sweeper, ResultStore};
pub use types::DownloadPayload;
