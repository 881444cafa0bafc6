use std::sync::Arc;

use async_trait::async_trait;

use crate::ledger::{
    error::{self, TransactionError},
    types::TransactionReceipt,
};

/// A submitted escrow transaction, release or refund, that can be waited on until finalized.
#[async_trait]
pub trait ReleaseHandle: Send + Sync {
    fn transaction_id(&self) -> &str;

    /// Resolves once the ledger reports the transaction as finalized.
    async fn await_confirmation(&self) -> TransactionReceipt;
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn release_payment(
        &self,
        contract_id: &str,
    ) -> Result<Box<dyn ReleaseHandle>, TransactionError>;

    /// Returns the escrowed funds to the payer. Ledgers without refunds reject the call.
    async fn cancel_escrow(
        &self,
        contract_id: &str,
    ) -> Result<Box<dyn ReleaseHandle>, TransactionError> {
        Err(error::rejected(format!(
            "escrow cancellation is not supported by this ledger ({contract_id})"
        )))
    }
}

/// Hands out a ledger client per pipeline attempt.
pub trait LedgerConnector: Send + Sync {
    fn connect(&self) -> Arc<dyn LedgerClient>;
}
