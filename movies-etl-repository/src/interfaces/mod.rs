//! Interface definitions for the pipeline's external collaborators.
//!
//! The traits here allow for dependency injection and swappable backends:
//! the pipeline only depends on these, the concrete PostgreSQL, Redis and
//! OpenSearch implementations are wired in by the binary.

mod search_engine_client;
mod source_store;
mod state_storage;

pub use search_engine_client::SearchEngineClient;
pub use source_store::SourceStore;
pub use state_storage::StateStorage;
