pub mod error;
pub mod file;
pub mod types;

pub use error::ConfigurationError;
pub use file::{load_requests, parse_requests};
pub use types::{
    ContractId, EthicalPolicy, NetworkFailureMode, RawEthicalPolicy, RawRequestDescriptor,
    RequestDescriptor, UnrecognizedPolicyHandling, VerificationFailureMode,
};
