use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    ledger::{TransactionError, TransactionId, TransactionReceipt},
    oracle::CommunicationError,
    request::{ContractId, UnrecognizedPolicyHandling},
};

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_unit_ms() -> u64 {
    1_000
}

fn default_oracle_timeout_ms() -> u64 {
    10_000
}

fn default_release_timeout_ms() -> u64 {
    30_000
}

fn default_confirmation_timeout_ms() -> u64 {
    120_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// One backoff time unit; attempt `i` waits `2^i` units.
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTimeouts {
    #[serde(default = "default_oracle_timeout_ms")]
    pub oracle_timeout_ms: u64,
    #[serde(default = "default_release_timeout_ms")]
    pub release_timeout_ms: u64,
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,
}

impl StageTimeouts {
    pub fn oracle(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms.max(1))
    }

    pub fn release(&self) -> Duration {
        Duration::from_millis(self.release_timeout_ms.max(1))
    }

    pub fn confirmation(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms.max(1))
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            oracle_timeout_ms: default_oracle_timeout_ms(),
            release_timeout_ms: default_release_timeout_ms(),
            confirmation_timeout_ms: default_confirmation_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: StageTimeouts,
    #[serde(default)]
    pub unrecognized_policy: UnrecognizedPolicyHandling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Verifying,
    Releasing,
    Confirming,
    BackingOff,
    Refunding,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Verifying => "verification",
            Self::Releasing => "release",
            Self::Confirming => "confirmation",
            Self::BackingOff => "retry backoff",
            Self::Refunding => "refund",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalState {
    Notified {
        receipt: TransactionReceipt,
    },
    Paused {
        reason: String,
    },
    CommFailed {
        error: CommunicationError,
    },
    RetriesExhausted {
        attempts: u32,
        last_error: TransactionError,
    },
    ReleaseFailed {
        error: TransactionError,
    },
    ConfirmationTimedOut {
        transaction_id: TransactionId,
    },
    /// `transaction_id` is set when the release was already submitted.
    Cancelled {
        stage: PipelineStage,
        transaction_id: Option<TransactionId>,
    },
    /// Operator cancellation: the escrow went back to the payer.
    Refunded {
        receipt: TransactionReceipt,
        reason: String,
    },
    RefundFailed {
        error: TransactionError,
    },
    /// An unrecognized policy mode left the failure unhandled.
    Inert {
        stage: PipelineStage,
        detail: String,
    },
}

impl TerminalState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Notified { .. } => "notified",
            Self::Paused { .. } => "paused",
            Self::CommFailed { .. } => "comm_failed",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::ReleaseFailed { .. } => "release_failed",
            Self::ConfirmationTimedOut { .. } => "confirmation_timed_out",
            Self::Cancelled { .. } => "cancelled",
            Self::Refunded { .. } => "refunded",
            Self::RefundFailed { .. } => "refund_failed",
            Self::Inert { .. } => "inert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub contract_id: ContractId,
    pub run_id: String,
    /// Full pipeline runs, including the initial one.
    pub attempts: u32,
    pub terminal: TerminalState,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.terminal, TerminalState::Notified { .. })
    }

    pub fn refunded(&self) -> bool {
        matches!(self.terminal, TerminalState::Refunded { .. })
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match &self.terminal {
            TerminalState::Notified { receipt } => Some(&receipt.transaction_id),
            TerminalState::Refunded { receipt, .. } => Some(&receipt.transaction_id),
            TerminalState::ConfirmationTimedOut { transaction_id } => Some(transaction_id),
            TerminalState::Cancelled { transaction_id, .. } => transaction_id.as_deref(),
            _ => None,
        }
    }
}
