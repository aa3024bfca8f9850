//! Error types for the movies ETL pipeline.

use movies_etl_repository::{SearchError, SourceError, StateError};
use movies_etl_shared::{Stream, Watermark};
use thiserror::Error;

/// Errors that can abort a stream's cycle.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the catalog database.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// Error from the watermark store.
    #[error("State error: {0}")]
    StateError(#[from] StateError),

    /// Error from the search engine.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// The source returned rows that do not move the watermark forward.
    #[error("Watermark for {stream} would move from {current} to {candidate}")]
    WatermarkRegression {
        stream: Stream,
        current: Watermark,
        candidate: Watermark,
    },
}

impl PipelineError {
    /// Create a watermark regression error.
    pub fn watermark_regression(stream: Stream, current: Watermark, candidate: Watermark) -> Self {
        Self::WatermarkRegression {
            stream,
            current,
            candidate,
        }
    }
}
