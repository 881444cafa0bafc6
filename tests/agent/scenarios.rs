use std::{path::Path, sync::Arc};

use escrow_agent::{
    agent::{Orchestrator, TerminalState},
    config::Config,
    ledger::error as ledger_error,
    oracle::VerificationOutcome,
    request::load_requests,
    testing::{LedgerBehavior, RecordingNotificationSink, ScriptedLedgerConnector, ScriptedOracle},
};

use crate::{OK_ENDPOINT, PENDING_ENDPOINT, harness, request};

#[tokio::test(start_paused = true)]
async fn given_completed_and_approved_when_processed_then_release_is_notified_once() {
    let h = harness(ScriptedOracle::approved(), ScriptedLedgerConnector::succeeding());

    let report = h
        .orchestrator
        .process(&request("BODEGA_C_INV_001", OK_ENDPOINT))
        .await;

    assert!(report.succeeded(), "unexpected terminal: {:?}", report.terminal);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.transaction_id(), Some("0xtest0000"));

    let messages = h.sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("BODEGA_C_INV_001"));
    assert!(messages[0].contains("released successfully"));
    assert!(messages[0].contains("0xtest0000"));
    assert_eq!(h.oracle.endpoints().await, vec![OK_ENDPOINT.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn given_pending_verification_when_processed_then_payment_is_paused_without_ledger_call() {
    let h = harness(
        ScriptedOracle::always(VerificationOutcome::Pending {
            reason: "Faltan metadatos GPS".to_string(),
        }),
        ScriptedLedgerConnector::succeeding(),
    );

    let report = h
        .orchestrator
        .process(&request("BODEGA_C_INV_002", PENDING_ENDPOINT))
        .await;

    assert_eq!(
        report.terminal,
        TerminalState::Paused {
            reason: "Faltan metadatos GPS".to_string()
        }
    );
    assert_eq!(report.attempts, 1);
    assert!(h.ledger.submissions().await.is_empty());

    let messages = h.sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("PAUSED"));
    assert!(messages[0].contains("Faltan metadatos GPS"));
}

#[tokio::test(start_paused = true)]
async fn given_first_release_fails_when_processed_then_full_pipeline_retry_succeeds() {
    let h = harness(
        ScriptedOracle::approved(),
        ScriptedLedgerConnector::new(vec![
            LedgerBehavior::Fail(ledger_error::resource_exhausted(
                "release transaction failed: gas limit exceeded",
            )),
            LedgerBehavior::Succeed,
        ]),
    );

    let report = h
        .orchestrator
        .process(&request("BODEGA_C_INV_003", OK_ENDPOINT))
        .await;

    assert!(report.succeeded(), "unexpected terminal: {:?}", report.terminal);
    assert_eq!(report.attempts, 2);
    assert_eq!(h.oracle.calls(), 2, "retry must re-verify before releasing");

    let submissions = h.ledger.submissions().await;
    assert_eq!(submissions.len(), 2);
    assert_ne!(
        submissions[0].connection, submissions[1].connection,
        "each attempt uses a fresh ledger client"
    );

    let messages = h.sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("released successfully"));
}

#[tokio::test(start_paused = true)]
async fn given_demo_files_when_processed_then_each_scenario_reaches_its_terminal_state() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let config = Config::load(&root.join("demos/escrow-agent.jsonc")).expect("demo config");
    let requests = load_requests(
        &root.join("demos/requests.jsonc"),
        config.agent.unrecognized_policy,
    )
    .expect("demo requests");
    let sink = Arc::new(RecordingNotificationSink::new());
    let orchestrator = Orchestrator::new(
        config.oracle.build().expect("static oracle"),
        config.ledger.build(),
        sink.clone(),
        &config.agent,
    );

    let mut terminals = Vec::new();
    for request in &requests {
        let report = orchestrator.process(request).await;
        terminals.push((report.contract_id.clone(), report.terminal.label(), report.attempts));
    }

    assert_eq!(
        terminals,
        vec![
            ("BODEGA_C_INV_001".to_string(), "notified", 1),
            ("BODEGA_C_INV_002".to_string(), "paused", 1),
            ("BODEGA_C_INV_003".to_string(), "notified", 2),
        ]
    );
    assert_eq!(sink.messages().await.len(), 3);
}
