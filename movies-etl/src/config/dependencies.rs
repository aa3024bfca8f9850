//! Dependency initialization and wiring for the movies ETL.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::config::Settings;
use crate::EtlError;
use movies_etl_pipeline::{Orchestrator, RetryPolicy};
use movies_etl_repository::{
    OpenSearchClient, PostgresSource, RedisStateStorage, SearchEngineClient, SearchError,
    StateError,
};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from `settings`.
    ///
    /// The search engine and the watermark store are contacted right away,
    /// retried with the configured backoff so the ETL can start before them.
    /// The catalog database is connected on first use.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(EtlError)` - If initialization fails
    pub async fn new(
        settings: &Settings,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, EtlError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            redis_url = %settings.redis_url,
            state_key = %settings.state_key,
            batch_size = settings.batch_size,
            "Initializing dependencies"
        );

        let retry = RetryPolicy::new(settings.retry_config()).with_shutdown(shutdown.clone());

        // Initialize OpenSearch client
        let search_client = OpenSearchClient::new(&settings.opensearch_url)
            .await
            .map_err(|e| EtlError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        wait_for_search_engine(&retry, || search_client.health_check()).await?;

        // Initialize watermark store
        let state = connect_state_store(&retry, || {
            RedisStateStorage::new(&settings.redis_url, settings.state_key.clone())
        })
        .await?;

        // Initialize catalog source
        let source = PostgresSource::new(&settings.database_url, settings.db_options.as_deref())?;

        // Create orchestrator
        let orchestrator = Orchestrator::from_clients(
            Arc::new(source),
            Arc::new(state),
            Arc::new(search_client),
            settings.retry_config(),
            settings.orchestrator_config(),
            shutdown,
        );

        Ok(Self { orchestrator })
    }
}

/// Run `health_check` until the cluster reports green or yellow.
async fn wait_for_search_engine<F, Fut>(
    retry: &RetryPolicy,
    health_check: F,
) -> Result<(), EtlError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool, SearchError>>,
{
    retry
        .call("search_health_check", || {
            let check = health_check();
            async move {
                match check.await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(SearchError::connection("OpenSearch cluster is unhealthy")),
                    Err(e) => Err(e),
                }
            }
        })
        .await?;

    info!("OpenSearch connection verified");
    Ok(())
}

async fn connect_state_store<S, F, Fut>(retry: &RetryPolicy, connect: F) -> Result<S, EtlError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<S, StateError>>,
{
    let state = retry.call("connect_state_store", connect).await?;

    info!("Redis connection established");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use movies_etl_pipeline::RetryConfig;

    fn retry(limit_of_retries: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            start_sleep_time: Duration::from_millis(100),
            factor: 2.0,
            border_sleep_time: Duration::from_secs(1),
            limit_of_retries,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_store_started_late_is_awaited() {
        let attempts = AtomicU32::new(0);

        let state = connect_state_store(&retry(5), || async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt < 3 {
                Err(StateError::connection("Connection refused"))
            } else {
                Ok("connected")
            }
        })
        .await
        .unwrap();

        assert_eq!(state, "connected");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_state_store_fails_after_the_limit() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), EtlError> = connect_state_store(&retry(2), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(StateError::connection("Connection refused"))
        })
        .await;

        assert!(matches!(result, Err(EtlError::StateError(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_search_engine_is_retried() {
        let attempts = AtomicU32::new(0);

        let result = wait_for_search_engine(&retry(5), || async {
            match attempts.fetch_add(1, Ordering::SeqCst) {
                0 => Err(SearchError::connection("error sending request")),
                1 => Ok(false),
                _ => Ok(true),
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_waiting_for_search_engine() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let result =
            wait_for_search_engine(&retry(0).with_shutdown(rx), || async { Ok(false) }).await;

        assert!(matches!(result, Err(EtlError::SearchError(_))));
    }
}
