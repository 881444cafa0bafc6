use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    Rejected,
    ResourceExhausted,
    NodeUnavailable,
    Timeout,
}

/// Ledger submission failure. Only `ResourceExhausted` and `NodeUnavailable` are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
}

impl TransactionError {
    pub fn new(kind: TransactionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransactionError {}

pub fn rejected(message: impl Into<String>) -> TransactionError {
    TransactionError::new(TransactionErrorKind::Rejected, message)
}

pub fn resource_exhausted(message: impl Into<String>) -> TransactionError {
    TransactionError::new(TransactionErrorKind::ResourceExhausted, message)
}

pub fn node_unavailable(message: impl Into<String>) -> TransactionError {
    TransactionError::new(TransactionErrorKind::NodeUnavailable, message)
}

pub fn timeout(message: impl Into<String>) -> TransactionError {
    TransactionError::new(TransactionErrorKind::Timeout, message)
}
