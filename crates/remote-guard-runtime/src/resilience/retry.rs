//! Bounded retry with a per-attempt timeout and linear backoff.
//!
//! Every attempt races the operation against `fallbackTimeout`; the losing
//! branch is dropped. Between attempts the executor waits
//! `retryDelay * attempt_index` (1x, 2x, ...) and never waits after the final
//! attempt. The outcome is reported to the [`HealthRecorder`] exactly once per
//! invocation, not once per attempt.

use backon::{BackoffBuilder, Retryable};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use remote_guard_core::{RemoteError, ResilienceConfig};

use super::registry::HealthRecorder;

/// Builds a [`LinearBackoff`] for a given number of attempts.
#[derive(Debug, Clone, Copy)]
pub struct LinearBuilder {
    unit: Duration,
    max_retries: u32,
}

impl LinearBuilder {
    /// Backoff for `attempts` total attempts, i.e. `attempts - 1` delays.
    pub fn new(unit: Duration, attempts: u32) -> Self {
        Self {
            unit,
            max_retries: attempts.saturating_sub(1),
        }
    }
}

impl BackoffBuilder for LinearBuilder {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        LinearBackoff {
            unit: self.unit,
            max_retries: self.max_retries,
            index: 0,
        }
    }
}

/// Delays of `unit * 1`, `unit * 2`, ... up to `max_retries` entries.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    unit: Duration,
    max_retries: u32,
    index: u32,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.index >= self.max_retries {
            return None;
        }
        self.index += 1;
        Some(self.unit.saturating_mul(self.index))
    }
}

/// Generic retry wrapper for remote operations.
#[derive(Clone)]
pub struct RetryExecutor {
    recorder: Arc<dyn HealthRecorder>,
    attempts: u32,
    delay: Duration,
    timeout: Duration,
    logging: bool,
}

impl RetryExecutor {
    /// Create an executor reporting to `recorder`.
    pub fn new(recorder: Arc<dyn HealthRecorder>, config: &ResilienceConfig) -> Self {
        Self {
            recorder,
            attempts: config.retry_attempts.max(1),
            delay: config.retry_delay,
            timeout: config.fallback_timeout,
            logging: config.enable_logging,
        }
    }

    /// Configured attempts per invocation.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `operation` with the configured number of attempts.
    pub async fn with_retry<T, F, Fut>(&self, remote_id: &str, operation: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        self.with_attempts(remote_id, self.attempts, operation).await
    }

    /// Run `operation` up to `attempts` times.
    ///
    /// Returns the first success, or the error of the last attempt once all
    /// attempts are exhausted. Earlier errors are only logged.
    pub async fn with_attempts<T, F, Fut>(
        &self,
        remote_id: &str,
        attempts: u32,
        mut operation: F,
    ) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let attempts = attempts.max(1);
        let timeout = self.timeout;
        let logging = self.logging;
        let attempt = AtomicU32::new(0);

        let outcome = (|| {
            let index = attempt.fetch_add(1, Ordering::SeqCst) + 1;
            let call = operation();
            async move {
                let started = Instant::now();
                let result = match tokio::time::timeout(timeout, call).await {
                    Ok(result) => result,
                    Err(_) => Err(RemoteError::Timeout(timeout)),
                };
                if logging {
                    tracing::debug!(
                        remote_id = %remote_id,
                        attempt = index,
                        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        ok = result.is_ok(),
                        "Attempt finished"
                    );
                }
                result
            }
        })
        .retry(LinearBuilder::new(self.delay, attempts))
        .sleep(tokio::time::sleep)
        .notify(|error: &RemoteError, delay: Duration| {
            if logging {
                tracing::warn!(
                    remote_id = %remote_id,
                    attempt = attempt.load(Ordering::SeqCst),
                    error = %error,
                    retry_in = %humantime::format_duration(delay),
                    "Attempt failed, retrying"
                );
            }
        })
        .await;

        match outcome {
            Ok(value) => {
                self.recorder.record_success(remote_id);
                Ok(value)
            }
            Err(error) => {
                if logging {
                    tracing::warn!(
                        remote_id = %remote_id,
                        attempts = attempt.load(Ordering::SeqCst),
                        error = %error,
                        "All attempts failed"
                    );
                }
                self.recorder.record_failure(remote_id);
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("attempts", &self.attempts)
            .field("delay", &self.delay)
            .field("timeout", &self.timeout)
            .finish()
    }
}
