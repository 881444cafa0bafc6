pub mod messages;
pub mod orchestrator;
pub mod retry;
pub mod types;

pub use orchestrator::Orchestrator;
pub use retry::{RetryClass, RetryExecutor, RetryOutcome};
pub use types::{
    AgentConfig, PipelineReport, PipelineStage, RetryConfig, StageTimeouts, TerminalState,
};
