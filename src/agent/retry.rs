use std::{fmt, future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    agent::{messages, types::RetryConfig},
    ledger::{TransactionError, TransactionErrorKind},
    notify::NotificationSink,
};

/// Failure classification for [`RetryExecutor`]. Only transient failures are retried.
pub trait RetryClass {
    fn is_transient(&self) -> bool;
}

/// A rejected transaction fails the same way again. A submission that timed out
/// may still land on the ledger, so resubmitting it risks a double release.
impl RetryClass for TransactionError {
    fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            TransactionErrorKind::ResourceExhausted | TransactionErrorKind::NodeUnavailable
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: E },
    Cancelled { attempts: u32 },
    /// A non-transient failure stopped the loop; it is handed back untouched.
    Aborted { attempts: u32, error: E },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

#[derive(Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    sink: Arc<dyn NotificationSink>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self { config, sink }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// `2^attempt` backoff units, no jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt);
        Duration::from_millis(self.config.backoff_unit_ms.saturating_mul(factor))
    }

    /// Sleeps `2^i` units before attempt `i`, then invokes `operation(i)`.
    ///
    /// Transient failures are retried until the attempt budget is spent, at which
    /// point the sink receives a single permanent-failure message. A non-transient
    /// failure ends the loop at once as [`RetryOutcome::Aborted`].
    pub async fn retry_with_backoff<T, E, F, Fut>(
        &self,
        contract_id: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> RetryOutcome<T, E>
    where
        E: RetryClass + fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0_u32;

        loop {
            let delay = self.backoff_delay(attempt);
            tracing::info!(
                target: "agent.retry",
                contract_id = %contract_id,
                attempt = attempt + 1,
                max_attempts = max_attempts,
                delay_ms = delay.as_millis() as u64,
                "backoff_wait"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(
                        target: "agent.retry",
                        contract_id = %contract_id,
                        attempts = attempt,
                        "backoff_cancelled"
                    );
                    return RetryOutcome::Cancelled { attempts: attempt };
                }
                _ = sleep(delay) => {}
            }

            match operation(attempt).await {
                Ok(value) => {
                    return RetryOutcome::Succeeded {
                        value,
                        attempts: attempt + 1,
                    };
                }
                Err(err) if err.is_transient() => {
                    attempt += 1;
                    tracing::warn!(
                        target: "agent.retry",
                        contract_id = %contract_id,
                        attempt = attempt,
                        error = %err,
                        "retry_attempt_failed"
                    );

                    if attempt >= max_attempts {
                        tracing::error!(
                            target: "agent.retry",
                            contract_id = %contract_id,
                            attempts = attempt,
                            error = %err,
                            "retries_exhausted"
                        );
                        self.sink
                            .notify(&messages::release_failed_permanently(
                                contract_id,
                                attempt,
                                &err.to_string(),
                            ))
                            .await;
                        return RetryOutcome::Exhausted {
                            attempts: attempt,
                            last_error: err,
                        };
                    }
                }
                Err(err) => {
                    return RetryOutcome::Aborted {
                        attempts: attempt + 1,
                        error: err,
                    };
                }
            }
        }
    }
}
