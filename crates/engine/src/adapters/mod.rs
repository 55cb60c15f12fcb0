mod bigquery;
mod trino;

pub use bigquery::BigQueryAdapter;
pub use trino::TrinoAdapter;
