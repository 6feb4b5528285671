//! Retry with exponential backoff for stage calls.
//!
//! One policy wraps the metadata, script and illustration calls. The
//! illustration poll loop has its own fixed-interval budget and is never
//! retried through here.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Transient;
use crate::metrics;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries (not including the initial attempt).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Factor applied to the delay after each retry.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier.max(1);
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Run `operation`, re-running it while `is_retryable` accepts the error
    /// and retries remain.
    pub async fn run_if<F, Fut, T, E, P>(
        &self,
        operation_name: &'static str,
        mut operation: F,
        is_retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut retry = 0u32;

        loop {
            match operation().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!(operation = operation_name, retries = retry, "Recovered after retry");
                    }
                    return Ok(value);
                }
                Err(e) if retry < self.max_retries && is_retryable(&e) => {
                    retry += 1;
                    let delay = self.delay_for_retry(retry);
                    warn!(
                        operation = operation_name,
                        attempt = retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    metrics::record_retry(operation_name);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// [`run_if`](Self::run_if) using the error's own classification.
    pub async fn run<F, Fut, T, E>(&self, operation_name: &'static str, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display + Transient,
    {
        self.run_if(operation_name, operation, E::is_transient).await
    }
}
