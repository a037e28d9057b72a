//! Per-call retries for outbound JSON-RPC requests.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

use crate::chain_reader::ChainReaderError;
use crate::scheduler::{IndexingError, StopSignal};

/// Exponential backoff with jitter for transient JSON-RPC failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound (exclusive) of the random jitter added to each delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
            max_jitter: Duration::from_millis(1_000),
        }
    }
}

impl RetryPolicy {
    /// Retries immediately. Meant for tests.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// `min(base_delay * 2^(attempt - 1) + jitter, max_delay)`, `attempt` starting at 1.
    pub fn delay_for(&self, attempt: u32, jitter: Duration) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let base_delay_ms = self.base_delay.as_millis() as u64;
        let delay_ms = base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent))
            .saturating_add(jitter.as_millis() as u64);

        Duration::from_millis(delay_ms).min(self.max_delay)
    }

    fn random_jitter(&self) -> Duration {
        let max_jitter_ms = self.max_jitter.as_millis() as u64;

        if max_jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..max_jitter_ms))
        }
    }
}

/// Runs `operation` until it succeeds, retrying transient failures forever.
///
/// Non-retryable errors are returned on the spot. Between attempts the stop
/// signal is consulted; once raised the call fails with [`IndexingError::Cancelled`].
pub async fn execute_with_retry<T, F, Fut>(
    operation_name: &str,
    policy: &RetryPolicy,
    stop_signal: &StopSignal,
    mut operation: F,
) -> Result<T, IndexingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChainReaderError>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() => {
                attempt = attempt.saturating_add(1);
                let delay = policy.delay_for(attempt, policy.random_jitter());

                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "Retrying transient JSON-RPC failure"
                );

                sleep(delay).await;

                if stop_signal.is_stopped() {
                    return Err(IndexingError::Cancelled);
                }
            }
            Err(error) => return Err(error.into()),
        }
    }
}
