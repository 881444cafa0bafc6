use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunicationErrorKind {
    Unreachable,
    Timeout,
    UnexpectedStatus,
    InvalidResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicationError {
    pub kind: CommunicationErrorKind,
    pub message: String,
    pub endpoint: Option<String>,
}

impl CommunicationError {
    pub fn new(kind: CommunicationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl fmt::Display for CommunicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.endpoint {
            Some(endpoint) => write!(f, "{} (endpoint={})", self.message, endpoint),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CommunicationError {}

pub fn unreachable(message: impl Into<String>) -> CommunicationError {
    CommunicationError::new(CommunicationErrorKind::Unreachable, message)
}

pub fn timeout(message: impl Into<String>) -> CommunicationError {
    CommunicationError::new(CommunicationErrorKind::Timeout, message)
}

pub fn unexpected_status(message: impl Into<String>) -> CommunicationError {
    CommunicationError::new(CommunicationErrorKind::UnexpectedStatus, message)
}

pub fn invalid_response(message: impl Into<String>) -> CommunicationError {
    CommunicationError::new(CommunicationErrorKind::InvalidResponse, message)
}
