use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::errors::ErrorKind;
use crate::models::content::Content;

/// Tool-level failures. These are reported back to the model, never raised to the caller.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("Tool execution failed: {0}")]
    ToolFailure(String),

    #[error("Tool call cancelled")]
    Cancelled,
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            ToolError::Timeout(_) => ErrorKind::Timeout,
            ToolError::ToolFailure(_) => ErrorKind::ToolFailure,
            ToolError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Outcome of one tool invocation as recorded in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub ok: bool,
    pub payload: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResult {
    pub fn ok(payload: Content) -> Self {
        Self {
            ok: true,
            payload,
            error: None,
        }
    }

    /// A failed result; the payload carries the error text so the model can read it
    pub fn failure(error: ToolError) -> Self {
        Self {
            ok: false,
            payload: Content::text(format!(
                "The tool call returned the following error:\n{}",
                error
            )),
            error: Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(ToolError::kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_carries_error_text() {
        let result = ToolResult::failure(ToolError::ToolFailure("boom".into()));
        assert!(!result.ok);
        assert_eq!(result.error_kind(), Some(ErrorKind::ToolFailure));
        assert!(result.payload.render().contains("boom"));
    }

    #[test]
    fn test_ok_has_no_error() {
        let result = ToolResult::ok(Content::text("fine"));
        assert!(result.ok);
        assert_eq!(result.error_kind(), None);
    }
}
