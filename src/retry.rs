//! Bounded retry with exponential backoff.
//!
//! Every failure is treated as retryable. After failed attempt `i`
//! (zero-based) the executor sleeps `base_delay * 2^i` before trying again,
//! and once the budget is spent the error from the last attempt is returned.

use std::{fmt::Display, future::Future, time::Duration};
use tracing::{debug, warn};

// 2^20 * base_delay is already far beyond any sane budget
const MAX_BACKOFF_EXPONENT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryExecutor {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryExecutor {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay slept after failed attempt `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `operation` with the executor's own retry budget.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_with(self.max_retries, operation).await
    }

    /// Run `operation` up to `max_retries + 1` times. The closure receives the
    /// zero-based attempt index.
    pub async fn run_with<T, E, F, Fut>(&self, max_retries: u32, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0u32;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Attempt {} succeeded after {} failures", attempt + 1, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                    if attempt >= max_retries {
                        return Err(e);
                    }
                    let delay = self.delay_for(attempt);
                    debug!("Retrying in {}ms...", delay.as_millis());
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
