use std::sync::Arc;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    agent::{
        messages,
        retry::{RetryClass, RetryExecutor, RetryOutcome},
        types::{AgentConfig, PipelineReport, PipelineStage, StageTimeouts, TerminalState},
    },
    ledger::{LedgerClient, LedgerConnector, TransactionError, error as ledger_error},
    notify::NotificationSink,
    oracle::{OracleClient, error as oracle_error},
    request::{NetworkFailureMode, RequestDescriptor, VerificationFailureMode},
};

/// Verify, release, confirm, notify. Each call owns its request end to end.
pub struct Orchestrator {
    oracle: Arc<dyn OracleClient>,
    ledger: Arc<dyn LedgerConnector>,
    sink: Arc<dyn NotificationSink>,
    retry: RetryExecutor,
    timeouts: StageTimeouts,
}

impl Orchestrator {
    pub fn new(
        oracle: Arc<dyn OracleClient>,
        ledger: Arc<dyn LedgerConnector>,
        sink: Arc<dyn NotificationSink>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            retry: RetryExecutor::new(config.retry.clone(), Arc::clone(&sink)),
            oracle,
            ledger,
            sink,
            timeouts: config.timeouts.clone(),
        }
    }

    pub async fn process(&self, request: &RequestDescriptor) -> PipelineReport {
        self.process_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Cancellation is observed during the backoff sleep and the confirmation wait.
    pub async fn process_with_cancellation(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> PipelineReport {
        let run_id = Uuid::now_v7().to_string();
        let span = tracing::info_span!(
            target: "agent",
            "pipeline",
            contract_id = %request.contract_id(),
            run_id = %run_id
        );
        self.drive(request, cancel, run_id).instrument(span).await
    }

    /// Operator cancellation: refunds the escrow to the payer without consulting the oracle.
    pub async fn cancel_escrow(&self, contract_id: &str, reason: &str) -> PipelineReport {
        let run_id = Uuid::now_v7().to_string();
        let span = tracing::info_span!(
            target: "agent",
            "cancellation",
            contract_id = %contract_id,
            run_id = %run_id
        );
        async move {
            tracing::info!(target: "agent", reason = %reason, "cancellation_started");
            let terminal = self.refund(contract_id, reason).await;
            tracing::info!(
                target: "agent",
                terminal = terminal.label(),
                "cancellation_terminal"
            );
            PipelineReport {
                contract_id: contract_id.to_string(),
                run_id,
                attempts: 1,
                terminal,
            }
        }
        .instrument(span)
        .await
    }

    async fn refund(&self, contract_id: &str, reason: &str) -> TerminalState {
        let ledger = self.ledger.connect();

        tracing::debug!(target: "agent", stage = ?PipelineStage::Refunding, "stage_entered");
        let submitted = match timeout(self.timeouts.release(), ledger.cancel_escrow(contract_id)).await
        {
            Ok(result) => result,
            Err(_) => Err(ledger_error::timeout(format!(
                "refund submission did not complete within {} ms",
                self.timeouts.release().as_millis()
            ))),
        };
        let handle = match submitted {
            Ok(handle) => handle,
            Err(error) => {
                tracing::error!(
                    target: "agent",
                    error = %error,
                    kind = ?error.kind,
                    "refund_failed"
                );
                self.sink
                    .notify(&messages::refund_failed(contract_id, &error.to_string()))
                    .await;
                return TerminalState::RefundFailed { error };
            }
        };
        let transaction_id = handle.transaction_id().to_string();
        tracing::info!(
            target: "agent",
            transaction_id = %transaction_id,
            "refund_submitted"
        );

        match timeout(self.timeouts.confirmation(), handle.await_confirmation()).await {
            Ok(receipt) => {
                tracing::info!(
                    target: "agent",
                    transaction_id = %receipt.transaction_id,
                    "refund_confirmed"
                );
                self.sink
                    .notify(&messages::escrow_refunded(
                        contract_id,
                        reason,
                        &receipt.transaction_id,
                    ))
                    .await;
                TerminalState::Refunded {
                    receipt,
                    reason: reason.to_string(),
                }
            }
            Err(_) => {
                tracing::error!(
                    target: "agent",
                    transaction_id = %transaction_id,
                    "refund_confirmation_timed_out"
                );
                self.sink
                    .notify(&messages::refund_unconfirmed(
                        contract_id,
                        &transaction_id,
                        self.timeouts.confirmation(),
                    ))
                    .await;
                TerminalState::ConfirmationTimedOut { transaction_id }
            }
        }
    }

    async fn drive(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
        run_id: String,
    ) -> PipelineReport {
        tracing::info!(
            target: "agent",
            endpoint = %request.verification_endpoint(),
            network_failure_mode = %request.policy().network_failure_mode(),
            verification_failure_mode = %request.policy().verification_failure_mode(),
            "pipeline_started"
        );

        let (terminal, attempts) = match self
            .run_attempt(request, self.ledger.connect(), cancel)
            .await
        {
            Ok(terminal) => (terminal, 1),
            Err(err) => self.recover_release_failure(request, err, cancel).await,
        };

        tracing::info!(
            target: "agent",
            terminal = terminal.label(),
            attempts = attempts,
            "pipeline_terminal"
        );

        PipelineReport {
            contract_id: request.contract_id().to_string(),
            run_id,
            attempts,
            terminal,
        }
    }

    async fn recover_release_failure(
        &self,
        request: &RequestDescriptor,
        err: TransactionError,
        cancel: &CancellationToken,
    ) -> (TerminalState, u32) {
        let contract_id = request.contract_id();
        match request.policy().network_failure_mode() {
            NetworkFailureMode::ExponentialRetry if !err.is_transient() => {
                (self.release_not_retried(contract_id, err).await, 1)
            }
            NetworkFailureMode::ExponentialRetry => {
                tracing::warn!(
                    target: "agent",
                    error = %err,
                    kind = ?err.kind,
                    "release_failed_retrying"
                );
                // Full-pipeline retry: every attempt re-verifies before releasing.
                let outcome = self
                    .retry
                    .retry_with_backoff(contract_id, cancel, move |_attempt| {
                        self.run_attempt(request, self.ledger.connect(), cancel)
                    })
                    .await;

                match outcome {
                    RetryOutcome::Succeeded { value, attempts } => (value, attempts + 1),
                    RetryOutcome::Exhausted {
                        attempts,
                        last_error,
                    } => (
                        TerminalState::RetriesExhausted {
                            attempts,
                            last_error,
                        },
                        attempts + 1,
                    ),
                    RetryOutcome::Cancelled { attempts } => {
                        self.sink
                            .notify(&messages::pipeline_cancelled(
                                contract_id,
                                PipelineStage::BackingOff,
                                None,
                            ))
                            .await;
                        (
                            TerminalState::Cancelled {
                                stage: PipelineStage::BackingOff,
                                transaction_id: None,
                            },
                            attempts + 1,
                        )
                    }
                    RetryOutcome::Aborted { attempts, error } => {
                        (self.release_not_retried(contract_id, error).await, attempts + 1)
                    }
                }
            }
            NetworkFailureMode::Unrecognized(mode) => {
                tracing::warn!(
                    target: "agent",
                    mode = %mode,
                    error = %err,
                    "release_failure_unhandled"
                );
                (
                    TerminalState::Inert {
                        stage: PipelineStage::Releasing,
                        detail: err.to_string(),
                    },
                    1,
                )
            }
        }
    }

    async fn release_not_retried(&self, contract_id: &str, error: TransactionError) -> TerminalState {
        tracing::error!(
            target: "agent",
            error = %error,
            kind = ?error.kind,
            "release_failed_without_retry"
        );
        self.sink
            .notify(&messages::release_not_retried(contract_id, &error.to_string()))
            .await;
        TerminalState::ReleaseFailed { error }
    }

    /// One full run. A release failure is returned as `Err` so the caller can
    /// apply the network failure policy; every other outcome is terminal.
    async fn run_attempt(
        &self,
        request: &RequestDescriptor,
        ledger: Arc<dyn LedgerClient>,
        cancel: &CancellationToken,
    ) -> Result<TerminalState, TransactionError> {
        let contract_id = request.contract_id();
        let endpoint = request.verification_endpoint();

        tracing::debug!(target: "agent", stage = ?PipelineStage::Verifying, "stage_entered");
        let verification = match timeout(self.timeouts.oracle(), self.oracle.verify(endpoint)).await
        {
            Ok(result) => result,
            Err(_) => Err(oracle_error::timeout(format!(
                "oracle did not answer within {} ms",
                self.timeouts.oracle().as_millis()
            ))
            .with_endpoint(endpoint)),
        };

        let outcome = match verification {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(
                    target: "agent",
                    error = %error,
                    kind = ?error.kind,
                    "oracle_unreachable"
                );
                self.sink
                    .notify(&messages::oracle_unreachable(contract_id))
                    .await;
                return Ok(TerminalState::CommFailed { error });
            }
        };

        tracing::info!(
            target: "agent",
            status = outcome.status_label(),
            authorized = outcome.authorizes_release(),
            "verification_completed"
        );

        if let Some(reason) = outcome.rejection_reason() {
            return Ok(match request.policy().verification_failure_mode() {
                VerificationFailureMode::PauseAndNotify => {
                    tracing::warn!(target: "agent", reason = %reason, "release_paused");
                    self.sink
                        .notify(&messages::verification_paused(contract_id, &reason))
                        .await;
                    TerminalState::Paused { reason }
                }
                VerificationFailureMode::Unrecognized(mode) => {
                    tracing::warn!(
                        target: "agent",
                        mode = %mode,
                        reason = %reason,
                        "verification_failure_unhandled"
                    );
                    TerminalState::Inert {
                        stage: PipelineStage::Verifying,
                        detail: reason,
                    }
                }
            });
        }

        tracing::debug!(target: "agent", stage = ?PipelineStage::Releasing, "stage_entered");
        let handle = match timeout(self.timeouts.release(), ledger.release_payment(contract_id))
            .await
        {
            Ok(Ok(handle)) => handle,
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(ledger_error::timeout(format!(
                    "release submission did not complete within {} ms",
                    self.timeouts.release().as_millis()
                )));
            }
        };
        let transaction_id = handle.transaction_id().to_string();
        tracing::info!(
            target: "agent",
            transaction_id = %transaction_id,
            "release_submitted"
        );

        tracing::debug!(target: "agent", stage = ?PipelineStage::Confirming, "stage_entered");
        let confirmation = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = timeout(self.timeouts.confirmation(), handle.await_confirmation()) => Some(result),
        };

        let receipt = match confirmation {
            Some(Ok(receipt)) => receipt,
            Some(Err(_)) => {
                tracing::error!(
                    target: "agent",
                    transaction_id = %transaction_id,
                    "confirmation_timed_out"
                );
                self.sink
                    .notify(&messages::confirmation_timed_out(
                        contract_id,
                        &transaction_id,
                        self.timeouts.confirmation(),
                    ))
                    .await;
                return Ok(TerminalState::ConfirmationTimedOut { transaction_id });
            }
            None => {
                tracing::info!(
                    target: "agent",
                    transaction_id = %transaction_id,
                    "confirmation_wait_cancelled"
                );
                self.sink
                    .notify(&messages::pipeline_cancelled(
                        contract_id,
                        PipelineStage::Confirming,
                        Some(transaction_id.as_str()),
                    ))
                    .await;
                return Ok(TerminalState::Cancelled {
                    stage: PipelineStage::Confirming,
                    transaction_id: Some(transaction_id),
                });
            }
        };

        tracing::info!(
            target: "agent",
            transaction_id = %receipt.transaction_id,
            "release_confirmed"
        );
        self.sink
            .notify(&messages::release_succeeded(
                contract_id,
                &receipt.transaction_id,
            ))
            .await;
        Ok(TerminalState::Notified { receipt })
    }
}
