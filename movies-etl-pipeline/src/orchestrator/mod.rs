//! Orchestrator module for the movies ETL pipeline.
//!
//! Coordinates the watermark store, extractor, processor, and loader
//! components.
//!
//! Streams are processed one at a time. Within a stream, every batch goes
//! through extract, transform, load and advance in that order, and the
//! watermark only moves once its batch has been written.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::PipelineError;
use crate::extractor::Extractor;
use crate::loader::SearchLoader;
use crate::processor::DocumentProcessor;
use crate::retry::{Classify, ErrorClass, RetryConfig, RetryPolicy};
use crate::schema::IndexSchemaManager;
use crate::state::WatermarkStore;
use movies_etl_repository::{SearchEngineClient, SourceStore, StateStorage};
use movies_etl_shared::{Stream, Watermark};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of rows per batch.
    pub batch_size: usize,
    /// Pause between two ticks.
    pub poll_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// Stage of a stream's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Extracting,
    Transforming,
    Loading,
    Advancing,
}

/// Outcome of one stream's cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    pub stream: Stream,
    /// Number of non-empty batches processed.
    pub batches: usize,
    /// Rows read from the source.
    pub extracted: usize,
    /// Documents written to the index.
    pub indexed: usize,
    /// Rows dropped by the processor.
    pub skipped: usize,
    /// Watermark at the end of the cycle.
    pub watermark: Watermark,
    /// Whether the stream caught up with the source.
    ///
    /// False when the cycle stopped early on shutdown or on a partially
    /// failed batch.
    pub completed: bool,
}

impl StreamReport {
    fn new(stream: Stream, watermark: Watermark) -> Self {
        Self {
            stream,
            batches: 0,
            extracted: 0,
            indexed: 0,
            skipped: 0,
            watermark,
            completed: false,
        }
    }
}

/// A stream whose cycle failed during a tick.
#[derive(Debug)]
pub struct StreamFailure {
    pub stream: Stream,
    pub error: PipelineError,
}

impl StreamFailure {
    /// Which external system the failure came from.
    pub fn class(&self) -> ErrorClass {
        self.error.class()
    }
}

/// Outcome of one pass over all streams.
#[derive(Debug, Default)]
pub struct TickReport {
    pub reports: Vec<StreamReport>,
    pub failures: Vec<StreamFailure>,
}

impl TickReport {
    /// Report of `stream`, if its cycle succeeded.
    pub fn report(&self, stream: Stream) -> Option<&StreamReport> {
        self.reports.iter().find(|r| r.stream == stream)
    }

    /// Check if every stream's cycle succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Orchestrator that coordinates the pipeline components.
///
/// The orchestrator:
/// - Bootstraps the search indices
/// - Runs each stream until it catches up with the source
/// - Sleeps between ticks
/// - Handles shutdown signals
pub struct Orchestrator {
    watermarks: WatermarkStore,
    extractor: Extractor,
    processor: DocumentProcessor,
    loader: SearchLoader,
    schema: IndexSchemaManager,
    config: OrchestratorConfig,
    shutdown: watch::Receiver<bool>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    ///
    /// The pipeline stops starting new batches once `shutdown` holds `true`.
    pub fn new(
        watermarks: WatermarkStore,
        extractor: Extractor,
        processor: DocumentProcessor,
        loader: SearchLoader,
        schema: IndexSchemaManager,
        config: OrchestratorConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            watermarks,
            extractor,
            processor,
            loader,
            schema,
            config,
            shutdown,
        }
    }

    /// Create an orchestrator from the three boundary clients, sharing one
    /// retry configuration. Retries stop once shutdown is requested.
    pub fn from_clients(
        source: Arc<dyn SourceStore>,
        state: Arc<dyn StateStorage>,
        search: Arc<dyn SearchEngineClient>,
        retry: RetryConfig,
        config: OrchestratorConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let retry = RetryPolicy::new(retry).with_shutdown(shutdown.clone());

        Self::new(
            WatermarkStore::new(state, retry.clone()),
            Extractor::new(source, retry.clone()),
            DocumentProcessor::new(),
            SearchLoader::new(search.clone(), retry.clone()),
            IndexSchemaManager::new(search, retry),
            config,
            shutdown,
        )
    }

    /// Check if shutdown was requested.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Run the orchestrator.
    ///
    /// Runs a tick, then waits for the poll interval, until shutdown is
    /// requested. Failed streams are retried on the next tick.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        info!(
            batch_size = self.config.batch_size,
            poll_interval = ?self.config.poll_interval,
            "Starting movies ETL orchestrator"
        );

        let mut shutdown = self.shutdown.clone();

        loop {
            self.run_tick().await;

            if self.is_shutting_down() {
                break;
            }

            debug!(poll_interval = ?self.config.poll_interval, "Waiting for the next tick");
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                Ok(()) = shutdown.changed() => {}
            }

            if self.is_shutting_down() {
                break;
            }
        }

        info!("Orchestrator shutdown complete");
    }

    /// Bring every stream up to date once.
    ///
    /// A failing stream is logged and does not keep the following streams
    /// from running.
    #[instrument(skip(self))]
    pub async fn run_tick(&self) -> TickReport {
        let mut tick = TickReport::default();

        for stream in Stream::ALL {
            if self.is_shutting_down() {
                info!("Shutdown requested, skipping remaining streams");
                break;
            }

            let result = match self.schema.ensure_stream_index(stream).await {
                Ok(_) => self.run_stream(stream).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(report) => {
                    info!(
                        stream = %stream,
                        batches = report.batches,
                        extracted = report.extracted,
                        indexed = report.indexed,
                        skipped = report.skipped,
                        watermark = %report.watermark,
                        "Stream cycle finished"
                    );
                    tick.reports.push(report);
                }
                Err(e) => {
                    error!(
                        stream = %stream,
                        class = ?e.class(),
                        error = %e,
                        "Stream cycle failed"
                    );
                    tick.failures.push(StreamFailure { stream, error: e });
                }
            }
        }

        tick
    }

    /// Process batches of `stream` until it catches up with the source.
    ///
    /// # Returns
    ///
    /// * `Ok(StreamReport)` - Counters of the cycle and the final watermark
    /// * `Err(PipelineError)` - If a boundary kept failing after retries; the
    ///   watermark stays at the last fully indexed batch
    #[instrument(skip(self), fields(stream = %stream))]
    pub async fn run_stream(&self, stream: Stream) -> Result<StreamReport, PipelineError> {
        let mut watermark = self.watermarks.get(stream).await?;
        let mut report = StreamReport::new(stream, watermark);
        let mut state = StreamState::Idle;

        loop {
            if self.is_shutting_down() {
                info!("Shutdown requested, no new batch is started");
                break;
            }

            transition(stream, &mut state, StreamState::Extracting);
            let batch = self
                .extractor
                .extract(stream, &watermark, self.config.batch_size)
                .await?;

            let Some(candidate) = batch.next_watermark else {
                transition(stream, &mut state, StreamState::Idle);
                report.completed = true;
                break;
            };

            if candidate <= watermark {
                return Err(PipelineError::watermark_regression(stream, watermark, candidate));
            }

            let count = batch.count;
            let full = count >= self.config.batch_size;
            report.batches += 1;
            report.extracted += count;

            transition(stream, &mut state, StreamState::Transforming);
            let documents = self.processor.transform(stream, batch.rows);
            report.skipped += count - documents.len();

            transition(stream, &mut state, StreamState::Loading);
            let load = self.loader.load(stream.index_name(), &documents).await?;
            report.indexed += load.succeeded;

            if !load.is_complete() {
                warn!(
                    failed = load.failed,
                    watermark = %watermark,
                    "Batch partially indexed, watermark not advanced"
                );
                transition(stream, &mut state, StreamState::Idle);
                break;
            }

            transition(stream, &mut state, StreamState::Advancing);
            self.watermarks.advance(stream, &candidate).await?;
            watermark = candidate;
            report.watermark = candidate;

            if !full {
                transition(stream, &mut state, StreamState::Idle);
                report.completed = true;
                break;
            }
        }

        Ok(report)
    }

    /// Rewind every stream to the sentinel, forcing a full resync.
    pub async fn reset(&self) -> Result<(), PipelineError> {
        self.watermarks.reset_all().await
    }
}

fn transition(stream: Stream, state: &mut StreamState, next: StreamState) {
    debug!(stream = %stream, from = ?state, to = ?next, "Stream state changed");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use movies_etl_repository::{BulkSummary, SearchError, SourceError, StateError};
    use movies_etl_shared::{ExtractedRow, IndexDocument, PersonRow};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    /// Source ignoring the watermark, as a broken query would.
    struct StuckSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SourceStore for StuckSource {
        async fn fetch_changed(
            &self,
            _stream: Stream,
            _after: &Watermark,
            _limit: usize,
        ) -> Result<Vec<ExtractedRow>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ExtractedRow::Person(PersonRow {
                id: Uuid::from_u128(1),
                name: Some("Carrie Fisher".to_string()),
                modified: DateTime::from_timestamp(100, 0).unwrap(),
            })])
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        values: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl StateStorage for MemoryStorage {
        async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
            Ok(self.values.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StateError> {
            self.values
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    struct NullSearch;

    #[async_trait]
    impl SearchEngineClient for NullSearch {
        async fn index_exists(&self, _index_name: &str) -> Result<bool, SearchError> {
            Ok(true)
        }

        async fn create_index(
            &self,
            _index_name: &str,
            _settings: &Value,
        ) -> Result<(), SearchError> {
            Ok(())
        }

        async fn bulk_upsert(
            &self,
            _index_name: &str,
            documents: &[IndexDocument],
        ) -> Result<BulkSummary, SearchError> {
            Ok(BulkSummary::all_succeeded(documents.len()))
        }

        async fn health_check(&self) -> Result<bool, SearchError> {
            Ok(true)
        }
    }

    fn orchestrator(shutdown: watch::Receiver<bool>) -> (Orchestrator, Arc<StuckSource>) {
        let source = Arc::new(StuckSource {
            calls: AtomicUsize::new(0),
        });
        let orchestrator = Orchestrator::from_clients(
            source.clone(),
            Arc::new(MemoryStorage::default()),
            Arc::new(NullSearch),
            RetryConfig::default(),
            OrchestratorConfig {
                batch_size: 1,
                poll_interval: Duration::from_secs(60),
            },
            shutdown,
        );
        (orchestrator, source)
    }

    #[tokio::test]
    async fn test_source_that_does_not_advance_is_an_error() {
        let (_tx, rx) = watch::channel(false);
        let (orchestrator, source) = orchestrator(rx);

        let result = orchestrator.run_stream(Stream::Person).await;

        assert!(matches!(
            result,
            Err(PipelineError::WatermarkRegression {
                stream: Stream::Person,
                ..
            })
        ));
        assert_eq!(result.unwrap_err().class(), ErrorClass::Unknown);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_start_extracts_nothing() {
        let (tx, rx) = watch::channel(false);
        let (orchestrator, source) = orchestrator(rx);
        tx.send(true).unwrap();

        let report = orchestrator.run_stream(Stream::Person).await.unwrap();

        assert!(!report.completed);
        assert_eq!(report.batches, 0);
        assert!(report.watermark.is_sentinel());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let (orchestrator, _source) = orchestrator(rx);

        let handle = tokio::spawn(async move { orchestrator.run().await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("run did not stop")
            .unwrap();
    }

    #[test]
    fn test_transition_updates_state() {
        let mut state = StreamState::Idle;

        transition(Stream::Genre, &mut state, StreamState::Extracting);

        assert_eq!(state, StreamState::Extracting);
    }
}
