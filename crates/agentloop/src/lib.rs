pub mod agent;
pub mod errors;
pub mod models;
pub mod prompt;
pub mod prompt_template;
pub mod providers;
pub mod tools;

pub use agent::{
    run, run_to_completion, run_with_options, AgentConfig, AgentRun, AgentSession, RunOptions,
    SessionState, StreamFragment,
};
pub use errors::{AgentError, AgentResult, ErrorKind};
