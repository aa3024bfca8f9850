//! Loader module for the movies ETL pipeline.
//!
//! Loads processed documents into the search index.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::errors::PipelineError;
use crate::retry::RetryPolicy;
use movies_etl_repository::{BulkItemFailure, SearchEngineClient};
use movies_etl_shared::IndexDocument;

/// Outcome of loading one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of documents sent.
    pub total: usize,
    /// Number of documents written.
    pub succeeded: usize,
    /// Number of documents the search engine rejected.
    pub failed: usize,
    /// Details of the rejected documents.
    pub failures: Vec<BulkItemFailure>,
}

impl LoadReport {
    /// Check if every document of the batch was written.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Loader that writes documents into the search engine.
///
/// Every batch is written with one bulk request keyed by document id, so
/// loading the same batch twice leaves the index unchanged.
pub struct SearchLoader {
    client: Arc<dyn SearchEngineClient>,
    retry: RetryPolicy,
}

impl SearchLoader {
    /// Create a new search loader with the given client.
    pub fn new(client: Arc<dyn SearchEngineClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Load a batch of documents into `index_name`.
    ///
    /// Failures of the request as a whole are retried. Documents rejected
    /// individually are logged and counted in the report, they do not fail
    /// the call.
    #[instrument(skip(self, documents), fields(index = %index_name, count = documents.len()))]
    pub async fn load(
        &self,
        index_name: &str,
        documents: &[IndexDocument],
    ) -> Result<LoadReport, PipelineError> {
        if documents.is_empty() {
            debug!("Nothing to load");
            return Ok(LoadReport::default());
        }

        let summary = self
            .retry
            .call("bulk_upsert", || self.client.bulk_upsert(index_name, documents))
            .await?;

        for failure in &summary.failures {
            warn!(
                id = %failure.id,
                status = failure.status,
                reason = %failure.reason,
                "Failed to index document"
            );
        }

        if summary.has_failures() {
            warn!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Bulk request completed with failures"
            );
        } else {
            info!("Successfully indexed {} records", summary.succeeded);
        }

        Ok(LoadReport {
            total: summary.total,
            succeeded: summary.succeeded,
            failed: summary.failed,
            failures: summary.failures,
        })
    }
}
