pub mod error;
pub mod ports;
pub mod simulated;
pub mod types;

pub use error::{TransactionError, TransactionErrorKind};
pub use ports::{LedgerClient, LedgerConnector, ReleaseHandle};
pub use simulated::{SimulatedLedger, SimulatedLedgerConfig, SimulatedLedgerConnector};
pub use types::{TransactionId, TransactionReceipt};
