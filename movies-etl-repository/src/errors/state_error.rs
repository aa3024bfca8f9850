//! Errors raised by the watermark store.

use thiserror::Error;

/// Errors that can occur while reading or writing stream watermarks.
#[derive(Error, Debug)]
pub enum StateError {
    /// Failed to connect to the store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A store command failed.
    #[error("Command error: {0}")]
    CommandError(String),

    /// A stored value could not be interpreted.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl StateError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a command error.
    pub fn command(msg: impl Into<String>) -> Self {
        Self::CommandError(msg.into())
    }

    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<redis::RedisError> for StateError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
            Self::ConnectionError(err.to_string())
        } else {
            Self::CommandError(err.to_string())
        }
    }
}
