//! Per-stream watermark persistence.
//!
//! The store, not memory, is the source of truth: the pipeline reads the
//! watermark at the start of every stream cycle and writes it after every
//! indexed batch.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::errors::PipelineError;
use crate::retry::RetryPolicy;
use movies_etl_repository::{StateError, StateStorage};
use movies_etl_shared::{Stream, Watermark};

/// Reads and writes stream watermarks through a `StateStorage`.
pub struct WatermarkStore {
    storage: Arc<dyn StateStorage>,
    retry: RetryPolicy,
}

impl WatermarkStore {
    /// Create a new watermark store.
    pub fn new(storage: Arc<dyn StateStorage>, retry: RetryPolicy) -> Self {
        Self { storage, retry }
    }

    /// Get the stream's watermark.
    ///
    /// A stream without a stored watermark is initialized with the sentinel,
    /// so its first run is a full backfill. A stored value that cannot be
    /// parsed is reported as an error instead of being overwritten.
    #[instrument(skip(self), fields(stream = %stream))]
    pub async fn get(&self, stream: Stream) -> Result<Watermark, PipelineError> {
        let key = stream.state_key();
        let stored = self
            .retry
            .call("watermark.get", || self.storage.get(key))
            .await?;

        match stored {
            Some(value) => {
                let watermark = value
                    .parse::<Watermark>()
                    .map_err(|e| StateError::invalid_value(key, e.to_string()))?;
                info!(watermark = %watermark, "State received, the ETL process continues");
                Ok(watermark)
            }
            None => {
                let sentinel = Watermark::sentinel();
                self.write(key, &sentinel).await?;
                info!(
                    watermark = %sentinel,
                    "There is no state for the stream, state was created"
                );
                Ok(sentinel)
            }
        }
    }

    /// Overwrite the stream's watermark.
    ///
    /// Monotonicity is the caller's responsibility.
    #[instrument(skip(self), fields(stream = %stream, watermark = %watermark))]
    pub async fn advance(
        &self,
        stream: Stream,
        watermark: &Watermark,
    ) -> Result<(), PipelineError> {
        self.write(stream.state_key(), watermark).await
    }

    /// Rewind every stream to the sentinel, forcing a full resync.
    #[instrument(skip(self))]
    pub async fn reset_all(&self) -> Result<(), PipelineError> {
        let sentinel = Watermark::sentinel();
        for stream in Stream::ALL {
            self.write(stream.state_key(), &sentinel).await?;
        }
        warn!("All stream watermarks were reset");
        Ok(())
    }

    async fn write(&self, key: &str, watermark: &Watermark) -> Result<(), PipelineError> {
        let value = watermark.to_string();
        self.retry
            .call("watermark.set", || self.storage.set(key, &value))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    /// In-memory storage whose first `failures` calls fail.
    struct MockStorage {
        values: Mutex<HashMap<String, String>>,
        failures: AtomicUsize,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                values: Mutex::new(HashMap::new()),
                failures: AtomicUsize::new(0),
            }
        }

        fn failing(failures: usize) -> Self {
            let storage = Self::new();
            storage.failures.store(failures, Ordering::SeqCst);
            storage
        }

        fn check(&self) -> Result<(), StateError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StateError::connection("Connection refused"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StateStorage for MockStorage {
        async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
            self.check()?;
            Ok(self.values.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StateError> {
            self.check()?;
            self.values
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    fn retry() -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            start_sleep_time: Duration::from_millis(10),
            factor: 2.0,
            border_sleep_time: Duration::from_millis(100),
            limit_of_retries: 2,
        })
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_get_initializes_sentinel() {
        let storage = Arc::new(MockStorage::new());
        let store = WatermarkStore::new(storage.clone(), retry());

        let watermark = store.get(Stream::FilmWork).await.unwrap();

        assert!(watermark.is_sentinel());
        assert_eq!(
            storage.values.lock().await.get("film_work").cloned(),
            Some("1800-01-01T00:00:00Z".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_after_advance() {
        let store = WatermarkStore::new(Arc::new(MockStorage::new()), retry());
        let watermark = Watermark::at_row(ts(1_600_000_000), Uuid::from_u128(9));

        store.advance(Stream::Genre, &watermark).await.unwrap();

        assert_eq!(store.get(Stream::Genre).await.unwrap(), watermark);
        assert!(store.get(Stream::Person).await.unwrap().is_sentinel());
    }

    #[tokio::test]
    async fn test_reads_legacy_values() {
        let storage = Arc::new(MockStorage::new());
        storage
            .values
            .lock()
            .await
            .insert("person".to_string(), "2021-06-16 20:14:09+00:00".to_string());
        let store = WatermarkStore::new(storage, retry());

        let watermark = store.get(Stream::Person).await.unwrap();

        assert_eq!(watermark.modified(), ts(1_623_874_449));
        assert_eq!(watermark.last_id(), None);
    }

    #[tokio::test]
    async fn test_invalid_stored_value_is_an_error() {
        let storage = Arc::new(MockStorage::new());
        storage
            .values
            .lock()
            .await
            .insert("genre".to_string(), "garbage".to_string());
        let store = WatermarkStore::new(storage.clone(), retry());

        let result = store.get(Stream::Genre).await;

        assert!(matches!(
            result,
            Err(PipelineError::StateError(StateError::InvalidValue { .. }))
        ));
        assert_eq!(
            storage.values.lock().await.get("genre").cloned(),
            Some("garbage".to_string())
        );
    }

    #[tokio::test]
    async fn test_reset_all() {
        let store = WatermarkStore::new(Arc::new(MockStorage::new()), retry());
        for stream in Stream::ALL {
            store
                .advance(stream, &Watermark::new(ts(1_700_000_000)))
                .await
                .unwrap();
        }

        store.reset_all().await.unwrap();

        for stream in Stream::ALL {
            assert!(store.get(stream).await.unwrap().is_sentinel());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let store = WatermarkStore::new(Arc::new(MockStorage::failing(2)), retry());

        let watermark = store.get(Stream::FilmWork).await.unwrap();

        assert!(watermark.is_sentinel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_store_is_fatal() {
        let store = WatermarkStore::new(Arc::new(MockStorage::failing(100)), retry());

        let result = store.advance(Stream::FilmWork, &Watermark::sentinel()).await;

        assert!(matches!(result, Err(PipelineError::StateError(_))));
    }
}
