//! Errors raised by the relational source.

use thiserror::Error;

/// Errors that can occur while reading changed rows from the catalog database.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Failed to connect to the database.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The extraction query failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// A returned row did not have the expected shape.
    #[error("Row decode error: {0}")]
    DecodeError(String),
}

impl SourceError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }
}

impl From<tokio_postgres::Error> for SourceError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            Self::ConnectionError(err.to_string())
        } else {
            Self::QueryError(err.to_string())
        }
    }
}
