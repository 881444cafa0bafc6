use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::sleep};
use uuid::Uuid;

use crate::ledger::{
    error::{self, TransactionError},
    ports::{LedgerClient, LedgerConnector, ReleaseHandle},
    types::{TransactionId, TransactionReceipt},
};

fn default_confirmation_delay_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedLedgerConfig {
    #[serde(default = "default_confirmation_delay_ms")]
    pub confirmation_delay_ms: u64,
    /// Number of leading submissions that fail, per contract.
    #[serde(default)]
    pub failing_contracts: BTreeMap<String, u32>,
}

impl Default for SimulatedLedgerConfig {
    fn default() -> Self {
        Self {
            confirmation_delay_ms: default_confirmation_delay_ms(),
            failing_contracts: BTreeMap::new(),
        }
    }
}

/// Builds a fresh [`SimulatedLedger`] per attempt. The failure budget is shared
/// across instances so it is consumed exactly once per configured submission.
pub struct SimulatedLedgerConnector {
    confirmation_delay: Duration,
    remaining_failures: Arc<Mutex<BTreeMap<String, u32>>>,
}

impl SimulatedLedgerConnector {
    pub fn new(config: &SimulatedLedgerConfig) -> Self {
        Self {
            confirmation_delay: Duration::from_millis(config.confirmation_delay_ms),
            remaining_failures: Arc::new(Mutex::new(config.failing_contracts.clone())),
        }
    }
}

impl LedgerConnector for SimulatedLedgerConnector {
    fn connect(&self) -> Arc<dyn LedgerClient> {
        tracing::debug!(target: "ledger", "simulated_ledger_connected");
        Arc::new(SimulatedLedger {
            confirmation_delay: self.confirmation_delay,
            remaining_failures: Arc::clone(&self.remaining_failures),
        })
    }
}

pub struct SimulatedLedger {
    confirmation_delay: Duration,
    remaining_failures: Arc<Mutex<BTreeMap<String, u32>>>,
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn release_payment(
        &self,
        contract_id: &str,
    ) -> Result<Box<dyn ReleaseHandle>, TransactionError> {
        {
            let mut guard = self.remaining_failures.lock().await;
            if let Some(remaining) = guard.get_mut(contract_id)
                && *remaining > 0
            {
                *remaining -= 1;
                tracing::debug!(
                    target: "ledger",
                    contract_id = %contract_id,
                    remaining_failures = *remaining,
                    "simulated_release_failure"
                );
                return Err(error::resource_exhausted(
                    "release transaction failed: gas limit exceeded",
                ));
            }
        }

        let handle = self.submit(contract_id);
        tracing::debug!(
            target: "ledger",
            contract_id = %contract_id,
            transaction_id = %handle.transaction_id,
            "simulated_release_submitted"
        );
        Ok(Box::new(handle))
    }

    /// Refunds are never subject to the configured failure budget.
    async fn cancel_escrow(
        &self,
        contract_id: &str,
    ) -> Result<Box<dyn ReleaseHandle>, TransactionError> {
        let handle = self.submit(contract_id);
        tracing::debug!(
            target: "ledger",
            contract_id = %contract_id,
            transaction_id = %handle.transaction_id,
            "simulated_refund_submitted"
        );
        Ok(Box::new(handle))
    }
}

impl SimulatedLedger {
    fn submit(&self, contract_id: &str) -> SimulatedReleaseHandle {
        SimulatedReleaseHandle {
            transaction_id: format!("0x{}", Uuid::now_v7().simple()),
            contract_id: contract_id.to_string(),
            confirmation_delay: self.confirmation_delay,
        }
    }
}

struct SimulatedReleaseHandle {
    transaction_id: TransactionId,
    contract_id: String,
    confirmation_delay: Duration,
}

#[async_trait]
impl ReleaseHandle for SimulatedReleaseHandle {
    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    async fn await_confirmation(&self) -> TransactionReceipt {
        sleep(self.confirmation_delay).await;
        TransactionReceipt {
            transaction_id: self.transaction_id.clone(),
            contract_id: self.contract_id.clone(),
        }
    }
}
