//! Search engine client trait definition.
//!
//! This module defines the abstract interface for the search engine
//! operations the pipeline needs, allowing for different backend
//! implementations (OpenSearch, Elasticsearch, mocks in tests).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::types::BulkSummary;
use movies_etl_shared::IndexDocument;

/// Abstract interface for search engine operations.
///
/// The pipeline only ever bootstraps indices and writes to them; querying is
/// the job of a separate read service.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Check whether an index exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the index exists
    /// * `Ok(false)` - If it does not
    /// * `Err(SearchError)` - If the check could not be performed
    async fn index_exists(&self, index_name: &str) -> Result<bool, SearchError>;

    /// Create an index with the given settings and mappings.
    ///
    /// Creating an index that already exists is not an error.
    ///
    /// # Arguments
    ///
    /// * `index_name` - Name of the index to create
    /// * `settings` - Full index body (`settings` and `mappings`)
    async fn create_index(&self, index_name: &str, settings: &Value) -> Result<(), SearchError>;

    /// Write documents in a single bulk request, keyed by document id.
    ///
    /// Documents with an id that already exists are replaced, so sending the
    /// same documents twice leaves the index unchanged.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkSummary)` - Per-item outcome of the request
    /// * `Err(SearchError)` - If the request failed as a whole
    async fn bulk_upsert(
        &self,
        index_name: &str,
        documents: &[IndexDocument],
    ) -> Result<BulkSummary, SearchError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
