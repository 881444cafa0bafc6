use async_trait::async_trait;

use crate::oracle::{error::CommunicationError, types::VerificationOutcome};

/// Off-chain verification service. Implementations never retry internally.
#[async_trait]
pub trait OracleClient: Send + Sync {
    async fn verify(&self, endpoint: &str) -> Result<VerificationOutcome, CommunicationError>;
}
