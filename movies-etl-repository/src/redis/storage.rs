//! Watermarks kept as fields of a single Redis hash.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::errors::StateError;
use crate::interfaces::StateStorage;

/// Redis-backed state storage.
///
/// All values live in one hash (`hash_key`); each stream is a field of it.
/// The connection manager reconnects on its own after a dropped connection.
pub struct RedisStateStorage {
    connection: ConnectionManager,
    hash_key: String,
}

impl RedisStateStorage {
    /// Connect to Redis.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis URL (e.g., "redis://localhost:6379")
    /// * `hash_key` - Name of the hash holding the watermarks
    pub async fn new(url: &str, hash_key: impl Into<String>) -> Result<Self, StateError> {
        let client = redis::Client::open(url).map_err(|e| StateError::connection(e.to_string()))?;
        let connection = ConnectionManager::new(client).await?;
        let hash_key = hash_key.into();

        info!(url = %url, hash_key = %hash_key, "Connected to Redis");

        Ok(Self {
            connection,
            hash_key,
        })
    }
}

#[async_trait]
impl StateStorage for RedisStateStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection.hget(&self.hash_key, key).await?;

        debug!(key = %key, found = value.is_some(), "Read state");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StateError> {
        let mut connection = self.connection.clone();
        let _: () = connection.hset(&self.hash_key, key, value).await?;

        debug!(key = %key, value = %value, "Wrote state");
        Ok(())
    }
}
