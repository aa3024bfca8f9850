//! PostgreSQL implementation of the change source.

mod client;
mod queries;

pub use client::PostgresSource;
pub use queries::changed_rows_query;
