//! # Movies ETL Repository
//!
//! This crate provides traits and implementations for the three external
//! systems the ETL pipeline talks to: the catalog database it reads changes
//! from, the key-value store holding the stream watermarks and the search
//! engine it writes documents to.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod postgres;
pub mod redis;
pub mod types;

pub use errors::{SearchError, SourceError, StateError};
pub use interfaces::{SearchEngineClient, SourceStore, StateStorage};
pub use crate::opensearch::{index_settings, OpenSearchClient};
pub use postgres::PostgresSource;
pub use crate::redis::RedisStateStorage;
pub use types::{BulkItemFailure, BulkSummary};
