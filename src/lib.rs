pub mod agent;
pub mod cli;
pub mod config;
pub mod ledger;
pub mod logging;
pub mod notify;
pub mod oracle;
pub mod request;
pub mod testing;
