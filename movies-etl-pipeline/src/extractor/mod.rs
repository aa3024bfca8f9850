//! Extractor module for the movies ETL pipeline.
//!
//! Pulls one bounded page of changed rows per call.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::errors::PipelineError;
use crate::retry::RetryPolicy;
use movies_etl_repository::{SourceError, SourceStore};
use movies_etl_shared::{ExtractedBatch, Stream, Watermark};

/// Reads changed rows from the catalog database.
pub struct Extractor {
    source: Arc<dyn SourceStore>,
    retry: RetryPolicy,
}

impl Extractor {
    /// Create a new extractor.
    pub fn new(source: Arc<dyn SourceStore>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Extract the next batch of rows positioned after `watermark`.
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractedBatch)` - Up to `batch_size` rows ordered by
    ///   `(modified, id)`, with the position of the last one
    /// * `Err(PipelineError)` - If the source kept failing after retries, or
    ///   returned rows of another stream
    #[instrument(skip(self), fields(stream = %stream, watermark = %watermark))]
    pub async fn extract(
        &self,
        stream: Stream,
        watermark: &Watermark,
        batch_size: usize,
    ) -> Result<ExtractedBatch, PipelineError> {
        let rows = self
            .retry
            .call("extract", || {
                self.source.fetch_changed(stream, watermark, batch_size)
            })
            .await?;

        if let Some(row) = rows.iter().find(|row| row.stream() != stream) {
            return Err(SourceError::decode(format!(
                "Row {} belongs to {}, expected {}",
                row.id(),
                row.stream(),
                stream
            ))
            .into());
        }

        let batch = ExtractedBatch::from_rows(rows);

        if batch.is_empty() {
            info!("There is no new data to extract");
        } else {
            debug!(
                count = batch.count,
                next_watermark = ?batch.next_watermark.map(|w| w.to_string()),
                "Extracted batch"
            );
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;
    use async_trait::async_trait;
    use chrono::DateTime;
    use movies_etl_shared::{ExtractedRow, GenreRow, PersonRow};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    /// Source returning a fixed set of person rows, filtered like the real
    /// keyset query.
    struct MockSource {
        rows: Vec<ExtractedRow>,
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl SourceStore for MockSource {
        async fn fetch_changed(
            &self,
            _stream: Stream,
            after: &Watermark,
            limit: usize,
        ) -> Result<Vec<ExtractedRow>, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(SourceError::connection("server closed the connection"));
            }
            Ok(self
                .rows
                .iter()
                .filter(|row| row.position() > *after)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    fn person(id: u128, secs: i64) -> ExtractedRow {
        ExtractedRow::Person(PersonRow {
            id: Uuid::from_u128(id),
            name: Some(format!("Person {}", id)),
            modified: DateTime::from_timestamp(secs, 0).unwrap(),
        })
    }

    fn extractor(rows: Vec<ExtractedRow>, failures: usize) -> Extractor {
        let source = MockSource {
            rows,
            calls: AtomicUsize::new(0),
            failures,
        };
        let retry = RetryPolicy::new(RetryConfig {
            start_sleep_time: Duration::from_millis(10),
            factor: 2.0,
            border_sleep_time: Duration::from_millis(50),
            limit_of_retries: 3,
        });
        Extractor::new(Arc::new(source), retry)
    }

    #[tokio::test]
    async fn test_extract_returns_last_position() {
        let extractor = extractor(vec![person(1, 10), person(2, 20), person(3, 30)], 0);

        let batch = extractor
            .extract(Stream::Person, &Watermark::sentinel(), 2)
            .await
            .unwrap();

        assert_eq!(batch.count, 2);
        assert_eq!(batch.next_watermark, Some(person(2, 20).position()));
    }

    #[tokio::test]
    async fn test_extract_empty_batch_keeps_no_candidate() {
        let extractor = extractor(vec![person(1, 10)], 0);

        let batch = extractor
            .extract(Stream::Person, &person(1, 10).position(), 10)
            .await
            .unwrap();

        assert!(batch.is_empty());
        assert!(batch.next_watermark.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_retries_source_errors() {
        let extractor = extractor(vec![person(1, 10)], 2);

        let batch = extractor
            .extract(Stream::Person, &Watermark::sentinel(), 10)
            .await
            .unwrap();

        assert_eq!(batch.count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_gives_up_after_limit() {
        let extractor = extractor(vec![person(1, 10)], 10);

        let result = extractor
            .extract(Stream::Person, &Watermark::sentinel(), 10)
            .await;

        assert!(matches!(result, Err(PipelineError::SourceError(_))));
    }

    #[tokio::test]
    async fn test_extract_rejects_rows_of_other_streams() {
        let genre = ExtractedRow::Genre(GenreRow {
            id: Uuid::from_u128(5),
            name: Some("Drama".to_string()),
            description: None,
            modified: DateTime::from_timestamp(10, 0).unwrap(),
        });
        let extractor = extractor(vec![genre], 0);

        let result = extractor
            .extract(Stream::Person, &Watermark::sentinel(), 10)
            .await;

        assert!(matches!(
            result,
            Err(PipelineError::SourceError(SourceError::DecodeError(_)))
        ));
    }
}
