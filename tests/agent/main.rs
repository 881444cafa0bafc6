mod cancellation;
mod refund;
mod scenarios;

use std::{sync::Arc, time::Duration};

use escrow_agent::{
    agent::{AgentConfig, Orchestrator},
    request::{EthicalPolicy, RequestDescriptor},
    testing::{RecordingNotificationSink, ScriptedLedgerConnector, ScriptedOracle},
};

pub const OK_ENDPOINT: &str = "https://oracle.logistica.example/status/12345_OK";
pub const PENDING_ENDPOINT: &str = "https://oracle.logistica.example/status/12345_PENDIENTE";

pub struct Harness {
    pub oracle: Arc<ScriptedOracle>,
    pub ledger: Arc<ScriptedLedgerConnector>,
    pub sink: Arc<RecordingNotificationSink>,
    pub orchestrator: Orchestrator,
}

pub fn harness(oracle: ScriptedOracle, ledger: ScriptedLedgerConnector) -> Harness {
    harness_with_config(oracle, ledger, AgentConfig::default())
}

pub fn harness_with_config(
    oracle: ScriptedOracle,
    ledger: ScriptedLedgerConnector,
    config: AgentConfig,
) -> Harness {
    let oracle = Arc::new(oracle);
    let ledger = Arc::new(ledger);
    let sink = Arc::new(RecordingNotificationSink::new());
    let orchestrator = Orchestrator::new(oracle.clone(), ledger.clone(), sink.clone(), &config);
    Harness {
        oracle,
        ledger,
        sink,
        orchestrator,
    }
}

pub fn request(contract_id: &str, endpoint: &str) -> RequestDescriptor {
    RequestDescriptor::new(contract_id, endpoint, EthicalPolicy::default())
        .expect("request should be valid")
}

pub fn request_with_policy(
    contract_id: &str,
    endpoint: &str,
    policy: EthicalPolicy,
) -> RequestDescriptor {
    RequestDescriptor::new(contract_id, endpoint, policy).expect("request should be valid")
}

/// Paused-clock gaps land on the deadline; allow a millisecond of timer rounding.
pub fn assert_gap(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(1),
        "expected gap of {expected:?}, got {actual:?}",
    );
}
