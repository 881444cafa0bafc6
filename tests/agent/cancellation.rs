use std::time::Duration;

use escrow_agent::{
    agent::{PipelineStage, TerminalState},
    ledger::error as ledger_error,
    testing::{LedgerBehavior, ScriptedLedgerConnector, ScriptedOracle},
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{OK_ENDPOINT, harness, request};

#[tokio::test(start_paused = true)]
async fn given_cancel_during_backoff_when_processing_then_no_further_attempt_is_made() {
    let h = harness(
        ScriptedOracle::approved(),
        ScriptedLedgerConnector::new(vec![
            LedgerBehavior::Fail(ledger_error::node_unavailable("ledger node unavailable")),
            LedgerBehavior::Succeed,
        ]),
    );
    let cancel = CancellationToken::new();
    let request = request("c-shutdown", OK_ENDPOINT);

    let (report, ()) = tokio::join!(
        h.orchestrator.process_with_cancellation(&request, &cancel),
        async {
            sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        }
    );

    assert_eq!(
        report.terminal,
        TerminalState::Cancelled {
            stage: PipelineStage::BackingOff,
            transaction_id: None
        }
    );
    assert_eq!(report.transaction_id(), None);
    assert_eq!(report.attempts, 1);
    assert_eq!(h.ledger.submissions().await.len(), 1);
    assert_eq!(h.oracle.calls(), 1);

    let messages = h.sink.messages().await;
    assert_eq!(
        messages,
        vec!["Payment c-shutdown processing was cancelled during retry backoff.".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn given_cancel_during_confirmation_wait_when_processing_then_wait_is_abandoned() {
    let h = harness(
        ScriptedOracle::approved(),
        ScriptedLedgerConnector::new(vec![LedgerBehavior::NeverConfirm]),
    );
    let cancel = CancellationToken::new();
    let request = request("c-waiting", OK_ENDPOINT);
    let started = tokio::time::Instant::now();

    let (report, ()) = tokio::join!(
        h.orchestrator.process_with_cancellation(&request, &cancel),
        async {
            sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        }
    );

    assert_eq!(
        report.terminal,
        TerminalState::Cancelled {
            stage: PipelineStage::Confirming,
            transaction_id: Some("0xtest0000".to_string())
        }
    );
    assert_eq!(report.transaction_id(), Some("0xtest0000"));
    assert!(started.elapsed() < Duration::from_secs(120));
    assert_eq!(h.ledger.submissions().await.len(), 1);

    let messages = h.sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("cancelled during confirmation"));
    assert!(messages[0].contains("Transaction 0xtest0000 was already submitted"));
    assert!(messages[0].contains("Check the ledger before retrying"));
}

#[tokio::test(start_paused = true)]
async fn given_token_never_cancelled_when_processing_then_pipeline_completes_normally() {
    let h = harness(ScriptedOracle::approved(), ScriptedLedgerConnector::succeeding());
    let cancel = CancellationToken::new();

    let report = h
        .orchestrator
        .process_with_cancellation(&request("c-normal", OK_ENDPOINT), &cancel)
        .await;

    assert!(report.succeeded());
    assert!(!cancel.is_cancelled());
}
