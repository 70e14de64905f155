use std::{future::Future, time::Duration};

use tracing::{debug, warn};

use crate::error::{ClientError, RequestFailed};

/// Exponential backoff for gateway calls.
///
/// Retry `n` (0-based) waits `min(base_delay * 2^n, max_delay)`. Errors that
/// are not [retryable](ClientError::is_retryable) fail on the first attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Read queries: up to 3 retries, capped at 30 s.
    pub const QUERY: Self = Self {
        max_retries: 3,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
    };

    /// Mutations: up to 2 retries, capped at 10 s.
    pub const MUTATION: Self = Self {
        max_retries: 2,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(10),
    };

    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay)
    }

    /// `failures` counts the attempts that already failed, including `error`.
    pub fn should_retry(&self, failures: u32, error: &ClientError) -> bool {
        error.is_retryable() && failures <= self.max_retries
    }

    /// Runs `call` until it succeeds, fails with a client error, or the retry
    /// budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RequestFailed>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match call().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(operation, attempts, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if self.should_retry(attempts, &error) => {
                    let delay = self.delay_for(attempts - 1);
                    warn!(
                        operation,
                        attempts,
                        status = error.status(),
                        delay_ms = delay.as_millis() as u64,
                        "transient error, will retry: {error}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(RequestFailed { attempts, error }),
            }
        }
    }
}
