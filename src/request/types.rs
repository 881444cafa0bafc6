use std::fmt;

use serde::{Deserialize, Serialize};

use crate::request::error::ConfigurationError;

pub type ContractId = String;

const EXPONENTIAL_RETRY: &str = "EXPONENTIAL_RETRY";
const PAUSE_AND_NOTIFY: &str = "PAUSE_AND_NOTIFY";

/// Recovery strategy applied when the release transaction fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkFailureMode {
    ExponentialRetry,
    /// Kept verbatim from input. [`EthicalPolicy::from_raw`] yields it only under
    /// [`UnrecognizedPolicyHandling::Inert`].
    Unrecognized(String),
}

/// Strategy applied when the oracle does not authorize the release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailureMode {
    PauseAndNotify,
    /// See [`NetworkFailureMode::Unrecognized`].
    Unrecognized(String),
}

impl fmt::Display for NetworkFailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExponentialRetry => f.write_str(EXPONENTIAL_RETRY),
            Self::Unrecognized(raw) => write!(f, "{raw} (unrecognized)"),
        }
    }
}

impl fmt::Display for VerificationFailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PauseAndNotify => f.write_str(PAUSE_AND_NOTIFY),
            Self::Unrecognized(raw) => write!(f, "{raw} (unrecognized)"),
        }
    }
}

/// What to do with a policy value the agent does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UnrecognizedPolicyHandling {
    #[default]
    Reject,
    Inert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthicalPolicy {
    network_failure_mode: NetworkFailureMode,
    verification_failure_mode: VerificationFailureMode,
}

impl EthicalPolicy {
    /// Takes the modes as given, `Unrecognized` included. Input from a request
    /// file goes through [`EthicalPolicy::from_raw`] instead.
    pub fn new(
        network_failure_mode: NetworkFailureMode,
        verification_failure_mode: VerificationFailureMode,
    ) -> Self {
        Self {
            network_failure_mode,
            verification_failure_mode,
        }
    }

    pub fn from_raw(
        raw: &RawEthicalPolicy,
        handling: UnrecognizedPolicyHandling,
    ) -> Result<Self, ConfigurationError> {
        let network_failure_mode = match normalize_mode(&raw.network_failure_mode).as_str() {
            EXPONENTIAL_RETRY => NetworkFailureMode::ExponentialRetry,
            _ => match handling {
                UnrecognizedPolicyHandling::Reject => {
                    return Err(ConfigurationError::UnrecognizedNetworkFailureMode(
                        raw.network_failure_mode.clone(),
                    ));
                }
                UnrecognizedPolicyHandling::Inert => {
                    NetworkFailureMode::Unrecognized(raw.network_failure_mode.clone())
                }
            },
        };

        let verification_failure_mode =
            match normalize_mode(&raw.verification_failure_mode).as_str() {
                PAUSE_AND_NOTIFY => VerificationFailureMode::PauseAndNotify,
                _ => match handling {
                    UnrecognizedPolicyHandling::Reject => {
                        return Err(ConfigurationError::UnrecognizedVerificationFailureMode(
                            raw.verification_failure_mode.clone(),
                        ));
                    }
                    UnrecognizedPolicyHandling::Inert => VerificationFailureMode::Unrecognized(
                        raw.verification_failure_mode.clone(),
                    ),
                },
            };

        Ok(Self {
            network_failure_mode,
            verification_failure_mode,
        })
    }

    pub fn network_failure_mode(&self) -> &NetworkFailureMode {
        &self.network_failure_mode
    }

    pub fn verification_failure_mode(&self) -> &VerificationFailureMode {
        &self.verification_failure_mode
    }
}

impl Default for EthicalPolicy {
    fn default() -> Self {
        Self::new(
            NetworkFailureMode::ExponentialRetry,
            VerificationFailureMode::PauseAndNotify,
        )
    }
}

fn normalize_mode(raw: &str) -> String {
    raw.trim().to_ascii_uppercase().replace('-', "_")
}

fn default_network_failure_mode() -> String {
    EXPONENTIAL_RETRY.to_string()
}

fn default_verification_failure_mode() -> String {
    PAUSE_AND_NOTIFY.to_string()
}

/// Policy as it arrives from a request file, before validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RawEthicalPolicy {
    #[serde(default = "default_network_failure_mode")]
    pub network_failure_mode: String,
    #[serde(default = "default_verification_failure_mode")]
    pub verification_failure_mode: String,
}

impl Default for RawEthicalPolicy {
    fn default() -> Self {
        Self {
            network_failure_mode: default_network_failure_mode(),
            verification_failure_mode: default_verification_failure_mode(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RawRequestDescriptor {
    pub contract_id: ContractId,
    pub verification_endpoint: String,
    #[serde(default)]
    pub policy: RawEthicalPolicy,
}

/// One payment-release task. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    contract_id: ContractId,
    verification_endpoint: String,
    policy: EthicalPolicy,
}

impl RequestDescriptor {
    pub fn new(
        contract_id: impl Into<ContractId>,
        verification_endpoint: impl Into<String>,
        policy: EthicalPolicy,
    ) -> Result<Self, ConfigurationError> {
        let contract_id = contract_id.into();
        let verification_endpoint = verification_endpoint.into();
        if contract_id.trim().is_empty() {
            return Err(ConfigurationError::EmptyField {
                field: "contract_id",
            });
        }
        if verification_endpoint.trim().is_empty() {
            return Err(ConfigurationError::EmptyField {
                field: "verification_endpoint",
            });
        }

        Ok(Self {
            contract_id,
            verification_endpoint,
            policy,
        })
    }

    pub fn from_raw(
        raw: RawRequestDescriptor,
        handling: UnrecognizedPolicyHandling,
    ) -> Result<Self, ConfigurationError> {
        let policy = EthicalPolicy::from_raw(&raw.policy, handling)?;
        Self::new(raw.contract_id, raw.verification_endpoint, policy)
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    pub fn verification_endpoint(&self) -> &str {
        &self.verification_endpoint
    }

    pub fn policy(&self) -> &EthicalPolicy {
        &self.policy
    }
}
