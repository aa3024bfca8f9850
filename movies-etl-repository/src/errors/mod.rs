//! Error types for the movies ETL repository, one per external boundary.

mod search_error;
mod source_error;
mod state_error;

pub use search_error::SearchError;
pub use source_error::SourceError;
pub use state_error::StateError;
