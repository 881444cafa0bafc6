use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::oracle::{error::CommunicationError, ports::OracleClient, types::VerificationOutcome};

const UNKNOWN_ENDPOINT_REASON: &str = "unknown verification endpoint";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticOracleConfig {
    #[serde(default)]
    pub outcomes: BTreeMap<String, VerificationOutcome>,
}

/// Answers from a fixed endpoint table; unknown endpoints are reported as not found.
#[derive(Debug, Clone, Default)]
pub struct StaticOracleClient {
    outcomes: BTreeMap<String, VerificationOutcome>,
}

impl StaticOracleClient {
    pub fn new(config: &StaticOracleConfig) -> Self {
        Self {
            outcomes: config.outcomes.clone(),
        }
    }
}

#[async_trait]
impl OracleClient for StaticOracleClient {
    async fn verify(&self, endpoint: &str) -> Result<VerificationOutcome, CommunicationError> {
        let outcome = self
            .outcomes
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| VerificationOutcome::NotFound {
                reason: UNKNOWN_ENDPOINT_REASON.to_string(),
            });
        tracing::debug!(
            target: "oracle",
            endpoint = %endpoint,
            status = outcome.status_label(),
            "static_oracle_answered"
        );
        Ok(outcome)
    }
}
