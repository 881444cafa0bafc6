pub mod error;
pub mod http;
pub mod ports;
pub mod static_table;
pub mod types;

pub use error::{CommunicationError, CommunicationErrorKind};
pub use http::{HttpOracleClient, HttpOracleConfig};
pub use ports::OracleClient;
pub use static_table::{StaticOracleClient, StaticOracleConfig};
pub use types::VerificationOutcome;
