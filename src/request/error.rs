#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unrecognized network failure mode '{0}'")]
    UnrecognizedNetworkFailureMode(String),
    #[error("unrecognized verification failure mode '{0}'")]
    UnrecognizedVerificationFailureMode(String),
    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },
}
