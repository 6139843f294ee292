//! The agent runner: configuration, the per-request session and the caller-facing helpers.
mod config;
mod run;
mod session;

pub use config::{
    AgentConfig, AgentConfigBuilder, AgentFlags, SessionLimits, DEFAULT_MAX_STEPS,
    DEFAULT_TOOL_TIMEOUT,
};
pub use run::{run, run_to_completion, run_with_options, AgentRun, RunOptions};
pub use session::{AgentSession, SessionState, StreamFragment};
