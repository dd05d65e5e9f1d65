//! retrying fallible async operations with a linear backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// How often, and how patiently, to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// total attempts including the first; at least 1
    pub max_attempts: u32,

    /// wait before retry `n` is `n × base_delay`
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// delay before the attempt following `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Runs `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or `policy.max_attempts` is reached. Returns the last error.
pub async fn retry_with_backoff<T, E, Op, Fut>(
    policy: RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: Op,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && is_retryable(&err) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "{} failed on attempt {}/{}: {}. retrying in {}",
                    operation_name,
                    attempt,
                    policy.max_attempts,
                    err,
                    humantime::format_duration(delay)
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
