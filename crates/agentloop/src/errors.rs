use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// Classification shared by fatal session errors and recoverable tool errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    InvalidArguments,
    Timeout,
    ToolFailure,
    ModelUnavailable,
    StepLimitExceeded,
    Cancelled,
    Internal,
}

/// Errors that end a session (or prevent one from starting)
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model unavailable after {attempts} attempt(s): {message}")]
    ModelUnavailable { attempts: u32, message: String },

    #[error("Step limit of {0} tool rounds exceeded")]
    StepLimitExceeded(usize),

    #[error("Session cancelled")]
    Cancelled,

    #[error("Session exceeded its time budget of {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::Configuration(_) => ErrorKind::Configuration,
            AgentError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            AgentError::StepLimitExceeded(_) => ErrorKind::StepLimitExceeded,
            AgentError::Cancelled => ErrorKind::Cancelled,
            AgentError::Timeout(_) => ErrorKind::Timeout,
            AgentError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
