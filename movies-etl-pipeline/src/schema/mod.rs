//! Index bootstrap.
//!
//! Indices are created on first use from static settings. An existing index
//! is left as it is, its mapping is never reconciled.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::errors::PipelineError;
use crate::retry::RetryPolicy;
use movies_etl_repository::{index_settings, SearchEngineClient, SearchError};
use movies_etl_shared::Stream;

/// Creates missing search indices.
pub struct IndexSchemaManager {
    client: Arc<dyn SearchEngineClient>,
    retry: RetryPolicy,
}

impl IndexSchemaManager {
    /// Create a new schema manager.
    pub fn new(client: Arc<dyn SearchEngineClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Create `index_name` with `settings` unless it already exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the index was created by this call
    /// * `Ok(false)` - If it already existed
    #[instrument(skip(self, settings), fields(index = %index_name))]
    pub async fn ensure_index(
        &self,
        index_name: &str,
        settings: &Value,
    ) -> Result<bool, PipelineError> {
        let created = self
            .retry
            .call("ensure_index", || self.create_if_missing(index_name, settings))
            .await?;

        if created {
            info!("Index created");
        } else {
            debug!("Index already exists");
        }
        Ok(created)
    }

    async fn create_if_missing(
        &self,
        index_name: &str,
        settings: &Value,
    ) -> Result<bool, SearchError> {
        if self.client.index_exists(index_name).await? {
            return Ok(false);
        }
        self.client.create_index(index_name, settings).await?;
        Ok(true)
    }

    /// Ensure the index of `stream` exists.
    pub async fn ensure_stream_index(&self, stream: Stream) -> Result<bool, PipelineError> {
        self.ensure_index(stream.index_name(), &index_settings(stream))
            .await
    }
}
