use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use escrow_agent::{
    agent::{AgentConfig, Orchestrator, TerminalState},
    ledger::{
        LedgerClient, LedgerConnector, ReleaseHandle, TransactionError, TransactionErrorKind,
        error as ledger_error,
    },
    testing::{LedgerBehavior, RecordingNotificationSink, ScriptedLedgerConnector, ScriptedOracle},
};

use crate::{assert_gap, harness};

#[tokio::test(start_paused = true)]
async fn given_operator_cancellation_when_refund_confirms_then_refunded_and_payer_notified() {
    let h = harness(ScriptedOracle::approved(), ScriptedLedgerConnector::succeeding());

    let report = h
        .orchestrator
        .cancel_escrow("BODEGA_C_INV_002", "buyer dispute")
        .await;

    let TerminalState::Refunded { receipt, reason } = &report.terminal else {
        panic!("expected refund, got {:?}", report.terminal);
    };
    assert_eq!(receipt.transaction_id, "0xtest0000");
    assert_eq!(receipt.contract_id, "BODEGA_C_INV_002");
    assert_eq!(reason, "buyer dispute");
    assert!(report.refunded());
    assert!(!report.succeeded());
    assert_eq!(report.transaction_id(), Some("0xtest0000"));
    assert_eq!(report.terminal.label(), "refunded");

    assert_eq!(h.oracle.calls(), 0);
    assert!(h.ledger.submissions().await.is_empty());
    assert_eq!(h.ledger.refunds().await.len(), 1);

    let messages = h.sink.messages().await;
    assert_eq!(
        messages,
        vec![
            "Alert: payment BODEGA_C_INV_002 ended by MANUAL CANCELLATION. Reason: buyer dispute. Funds were refunded to the payer. Transaction hash: 0xtest0000"
                .to_string()
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn given_ledger_refuses_refund_when_cancelling_then_refund_failed_without_retry() {
    let h = harness(
        ScriptedOracle::approved(),
        ScriptedLedgerConnector::new(vec![
            LedgerBehavior::Fail(ledger_error::node_unavailable("ledger node unavailable")),
            LedgerBehavior::Succeed,
        ]),
    );

    let report = h.orchestrator.cancel_escrow("c-refund", "operator request").await;

    let TerminalState::RefundFailed { error } = &report.terminal else {
        panic!("expected refund failure, got {:?}", report.terminal);
    };
    assert_eq!(error.kind, TransactionErrorKind::NodeUnavailable);
    assert_eq!(report.attempts, 1);
    assert_eq!(h.ledger.refunds().await.len(), 1);

    let messages = h.sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("NOT refunded"));
    assert!(messages[0].contains("ledger node unavailable"));
}

#[tokio::test(start_paused = true)]
async fn given_refund_never_confirms_when_cancelling_then_timed_out_with_transaction() {
    let h = harness(
        ScriptedOracle::approved(),
        ScriptedLedgerConnector::new(vec![LedgerBehavior::NeverConfirm]),
    );

    let started = tokio::time::Instant::now();
    let report = h.orchestrator.cancel_escrow("c-limbo", "operator request").await;

    assert_eq!(
        report.terminal,
        TerminalState::ConfirmationTimedOut {
            transaction_id: "0xtest0000".to_string()
        }
    );
    assert_gap(started.elapsed(), Duration::from_secs(120));

    let messages = h.sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Refund for payment c-limbo was submitted as 0xtest0000"));
}

#[tokio::test(start_paused = true)]
async fn given_stalled_refund_submission_when_cancelling_then_refund_failed_on_timeout() {
    let h = harness(
        ScriptedOracle::approved(),
        ScriptedLedgerConnector::new(vec![LedgerBehavior::Stall]),
    );

    let report = h.orchestrator.cancel_escrow("c-stuck", "operator request").await;

    let TerminalState::RefundFailed { error } = &report.terminal else {
        panic!("expected refund failure, got {:?}", report.terminal);
    };
    assert_eq!(error.kind, TransactionErrorKind::Timeout);
}

struct ReleaseOnlyLedger;

#[async_trait]
impl LedgerClient for ReleaseOnlyLedger {
    async fn release_payment(
        &self,
        _contract_id: &str,
    ) -> Result<Box<dyn ReleaseHandle>, TransactionError> {
        Err(ledger_error::rejected("release not expected"))
    }
}

impl LedgerConnector for ReleaseOnlyLedger {
    fn connect(&self) -> Arc<dyn LedgerClient> {
        Arc::new(ReleaseOnlyLedger)
    }
}

#[tokio::test(start_paused = true)]
async fn given_ledger_without_refunds_when_cancelling_then_rejected() {
    let sink = Arc::new(RecordingNotificationSink::new());
    let orchestrator = Orchestrator::new(
        Arc::new(ScriptedOracle::approved()),
        Arc::new(ReleaseOnlyLedger),
        sink.clone(),
        &AgentConfig::default(),
    );

    let report = orchestrator.cancel_escrow("c-norefund", "operator request").await;

    let TerminalState::RefundFailed { error } = &report.terminal else {
        panic!("expected refund failure, got {:?}", report.terminal);
    };
    assert_eq!(error.kind, TransactionErrorKind::Rejected);
    assert!(error.message.contains("not supported"));
    assert_eq!(sink.messages().await.len(), 1);
}
