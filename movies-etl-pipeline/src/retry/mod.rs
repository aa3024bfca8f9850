//! Retry with exponential backoff for every I/O boundary call.
//!
//! The delay before the n-th retry is
//!
//! ```text
//! t = start_sleep_time * factor^n    if t < border_sleep_time
//! t = border_sleep_time              otherwise
//! ```
//!
//! jittered to a uniform value in `[t/2, t]`. The first retry waits exactly
//! `start_sleep_time`. A policy built [`with_shutdown`](RetryPolicy::with_shutdown)
//! stops retrying once shutdown is requested.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tracing::{error, info};

use crate::errors::PipelineError;
use movies_etl_repository::{SearchError, SourceError, StateError};

/// Configuration for the retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub start_sleep_time: Duration,
    /// Growth factor of the delay per retry.
    pub factor: f64,
    /// Upper bound of the delay.
    pub border_sleep_time: Duration,
    /// Number of retries after the first attempt. Zero means retry forever.
    pub limit_of_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            start_sleep_time: Duration::from_millis(100),
            factor: 2.0,
            border_sleep_time: Duration::from_secs(10),
            limit_of_retries: 10,
        }
    }
}

impl RetryConfig {
    /// Un-jittered delay after `retries` failures.
    pub fn backoff_delay(&self, retries: u32) -> Duration {
        let exponent = i32::try_from(retries).unwrap_or(i32::MAX);
        let computed = self.start_sleep_time.as_secs_f64() * self.factor.powi(exponent);
        let border = self.border_sleep_time.as_secs_f64();

        // `min` also maps an overflowed (infinite) delay to the border
        Duration::from_secs_f64(computed.min(border).max(0.0))
    }

    fn limit_exceeded(&self, retries: u32) -> bool {
        self.limit_of_retries > 0 && retries > self.limit_of_retries
    }
}

/// Which external system an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Source,
    WatermarkStore,
    SearchEngine,
    Unknown,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorClass::Source => "Database error",
            ErrorClass::WatermarkStore => "Watermark store error",
            ErrorClass::SearchEngine => "Search engine error",
            ErrorClass::Unknown => "Unknown error",
        };
        f.write_str(label)
    }
}

/// Errors that can tell which boundary they came from.
pub trait Classify {
    fn class(&self) -> ErrorClass;
}

impl Classify for SourceError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Source
    }
}

impl Classify for StateError {
    fn class(&self) -> ErrorClass {
        ErrorClass::WatermarkStore
    }
}

impl Classify for SearchError {
    fn class(&self) -> ErrorClass {
        ErrorClass::SearchEngine
    }
}

impl Classify for PipelineError {
    fn class(&self) -> ErrorClass {
        match self {
            PipelineError::SourceError(_) => ErrorClass::Source,
            PipelineError::StateError(_) => ErrorClass::WatermarkStore,
            PipelineError::SearchError(_) => ErrorClass::SearchEngine,
            PipelineError::WatermarkRegression { .. } => ErrorClass::Unknown,
        }
    }
}

/// Wraps fallible async operations with backoff retries.
///
/// The policy is cheap to clone; every pipeline component holds its own copy.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
    shutdown: Option<watch::Receiver<bool>>,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            shutdown: None,
        }
    }

    /// Give up instead of sleeping once `shutdown` holds `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// The policy's configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `op` until it succeeds or the retry limit is exceeded.
    ///
    /// Every failure is logged with its error class. Once the limit is
    /// exceeded, or shutdown is requested while waiting for the next attempt,
    /// the last error is returned to the caller.
    ///
    /// # Arguments
    ///
    /// * `operation` - Name used in log events
    /// * `op` - Produces a fresh future for each attempt
    pub async fn call<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let mut retries: u32 = 0;
        let mut delay = self.config.start_sleep_time;

        loop {
            match op().await {
                Ok(value) => {
                    if retries > 0 {
                        info!(
                            operation = %operation,
                            retries = retries,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    retries = retries.saturating_add(1);
                    let class = e.class();

                    error!(
                        operation = %operation,
                        attempt = retries,
                        class = ?class,
                        error = %e,
                        "{}", class
                    );

                    if self.config.limit_exceeded(retries) {
                        error!(
                            fatal = true,
                            operation = %operation,
                            attempts = retries,
                            error = %e,
                            "The number of retries exceeded"
                        );
                        return Err(e);
                    }

                    if self.pause(delay).await {
                        info!(
                            operation = %operation,
                            attempts = retries,
                            "Shutdown requested, giving up retries"
                        );
                        return Err(e);
                    }
                    delay = jitter(self.config.backoff_delay(retries));
                }
            }
        }
    }
}

impl RetryPolicy {
    /// Sleep for `delay`. Returns true when cut short by shutdown.
    async fn pause(&self, delay: Duration) -> bool {
        let Some(shutdown) = &self.shutdown else {
            tokio::time::sleep(delay).await;
            return false;
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = shutdown_requested(shutdown.clone()) => true,
        }
    }
}

/// Resolves once the flag is `true`; never resolves if the sender is gone.
async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Uniform random duration in `[delay / 2, delay]`.
fn jitter(delay: Duration) -> Duration {
    let high = delay.as_secs_f64();
    let low = high / 2.0;
    if high <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(rand::thread_rng().gen_range(low..=high))
}
