//! Relational source trait definition.

use async_trait::async_trait;

use crate::errors::SourceError;
use movies_etl_shared::{ExtractedRow, Stream, Watermark};

/// Read access to the catalog database.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Fetch up to `limit` rows of `stream` positioned strictly after `after`.
    ///
    /// Rows are ordered by `(modified, id)` ascending. Film work rows carry
    /// their genres and cast aggregated from the association tables.
    async fn fetch_changed(
        &self,
        stream: Stream,
        after: &Watermark,
        limit: usize,
    ) -> Result<Vec<ExtractedRow>, SourceError>;
}
