use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    sync::Mutex,
    time::{Instant, sleep},
};

use crate::{
    ledger::{
        LedgerClient, LedgerConnector, ReleaseHandle, TransactionError, TransactionReceipt,
    },
    notify::NotificationSink,
    oracle::{CommunicationError, OracleClient, VerificationOutcome},
};

fn pick<T: Clone>(plan: &[T], index: usize) -> Option<T> {
    plan.get(index).or_else(|| plan.last()).cloned()
}

/// Answers each `verify` call from a plan; the last entry repeats once the plan runs out.
pub struct ScriptedOracle {
    plan: Vec<Result<VerificationOutcome, CommunicationError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    endpoints: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(plan: Vec<Result<VerificationOutcome, CommunicationError>>) -> Self {
        Self {
            plan,
            delay: None,
            calls: AtomicUsize::new(0),
            endpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn always(outcome: VerificationOutcome) -> Self {
        Self::new(vec![Ok(outcome)])
    }

    pub fn approved() -> Self {
        Self::always(VerificationOutcome::Completed { approved: true })
    }

    pub fn unreachable(error: CommunicationError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().await.clone()
    }
}

#[async_trait]
impl OracleClient for ScriptedOracle {
    async fn verify(&self, endpoint: &str) -> Result<VerificationOutcome, CommunicationError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.endpoints.lock().await.push(endpoint.to_string());
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        pick(&self.plan, index).unwrap_or_else(|| {
            Ok(VerificationOutcome::NotFound {
                reason: "no scripted outcome".to_string(),
            })
        })
    }
}

#[derive(Debug, Clone)]
pub enum LedgerBehavior {
    Succeed,
    Fail(TransactionError),
    /// Submission succeeds but confirmation never arrives.
    NeverConfirm,
    /// Submission itself never completes.
    Stall,
}

#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub connection: usize,
    pub contract_id: String,
    pub at: Instant,
}

#[derive(Default)]
struct LedgerLog {
    submissions: Mutex<Vec<RecordedSubmission>>,
    refunds: Mutex<Vec<RecordedSubmission>>,
    transactions: AtomicUsize,
}

/// Hands out one scripted client per `connect`, following the plan by connection index.
pub struct ScriptedLedgerConnector {
    plan: Vec<LedgerBehavior>,
    connections: AtomicUsize,
    log: Arc<LedgerLog>,
}

impl ScriptedLedgerConnector {
    pub fn new(plan: Vec<LedgerBehavior>) -> Self {
        Self {
            plan,
            connections: AtomicUsize::new(0),
            log: Arc::new(LedgerLog::default()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(vec![LedgerBehavior::Succeed])
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Release submissions only; refunds are recorded apart.
    pub async fn submissions(&self) -> Vec<RecordedSubmission> {
        self.log.submissions.lock().await.clone()
    }

    pub async fn refunds(&self) -> Vec<RecordedSubmission> {
        self.log.refunds.lock().await.clone()
    }
}

impl LedgerConnector for ScriptedLedgerConnector {
    fn connect(&self) -> Arc<dyn LedgerClient> {
        let connection = self.connections.fetch_add(1, Ordering::SeqCst);
        Arc::new(ScriptedLedger {
            connection,
            behavior: pick(&self.plan, connection).unwrap_or(LedgerBehavior::Succeed),
            log: Arc::clone(&self.log),
        })
    }
}

struct ScriptedLedger {
    connection: usize,
    behavior: LedgerBehavior,
    log: Arc<LedgerLog>,
}

impl ScriptedLedger {
    async fn submit(
        &self,
        record: &Mutex<Vec<RecordedSubmission>>,
        contract_id: &str,
    ) -> Result<Box<dyn ReleaseHandle>, TransactionError> {
        record.lock().await.push(RecordedSubmission {
            connection: self.connection,
            contract_id: contract_id.to_string(),
            at: Instant::now(),
        });

        let confirms = match &self.behavior {
            LedgerBehavior::Succeed => true,
            LedgerBehavior::NeverConfirm => false,
            LedgerBehavior::Fail(err) => return Err(err.clone()),
            LedgerBehavior::Stall => {
                std::future::pending::<()>().await;
                false
            }
        };

        let sequence = self.log.transactions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedReleaseHandle {
            transaction_id: format!("0xtest{sequence:04}"),
            contract_id: contract_id.to_string(),
            confirms,
        }))
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn release_payment(
        &self,
        contract_id: &str,
    ) -> Result<Box<dyn ReleaseHandle>, TransactionError> {
        self.submit(&self.log.submissions, contract_id).await
    }

    async fn cancel_escrow(
        &self,
        contract_id: &str,
    ) -> Result<Box<dyn ReleaseHandle>, TransactionError> {
        self.submit(&self.log.refunds, contract_id).await
    }
}

struct ScriptedReleaseHandle {
    transaction_id: String,
    contract_id: String,
    confirms: bool,
}

#[async_trait]
impl ReleaseHandle for ScriptedReleaseHandle {
    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    async fn await_confirmation(&self) -> TransactionReceipt {
        if !self.confirms {
            std::future::pending::<()>().await;
        }
        TransactionReceipt {
            transaction_id: self.transaction_id.clone(),
            contract_id: self.contract_id.clone(),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotificationSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(&self, message: &str) {
        self.messages.lock().await.push(message.to_string());
    }
}
