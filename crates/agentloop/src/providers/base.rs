use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::models::message::{Message, ToolRequest};
use crate::models::tool::Tool;

/// One item of a streamed answer
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerPart {
    Text(String),
    /// Tool calls the model emitted after it had started writing text.
    /// Only ever the last item of the stream.
    ToolCalls(Vec<ToolRequest>),
}

impl AnswerPart {
    pub fn text<S: Into<String>>(text: S) -> Self {
        AnswerPart::Text(text.into())
    }
}

/// Incremental pieces of an answer, in arrival order
pub type TextStream = BoxStream<'static, Result<AnswerPart, ProviderError>>;

/// What the model decided to do with the history it was given
pub enum ModelTurn {
    /// Answer the user, streamed as it is produced. The stream may still end in tool calls,
    /// in which case the text streamed so far was a preamble to them.
    FinalAnswer(TextStream),
    /// Run these tools first; order is the order the model emitted them
    ToolCalls(Vec<ToolRequest>),
}

impl std::fmt::Debug for ModelTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTurn::FinalAnswer(_) => f.write_str("FinalAnswer(..)"),
            ModelTurn::ToolCalls(calls) => f.debug_tuple("ToolCalls").field(calls).finish(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Transport failures, rate limits and server errors; worth retrying
    #[error("Model backend unavailable: {0}")]
    Unavailable(String),

    #[error("Model request rejected: {0}")]
    Request(String),

    #[error("Malformed model response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_))
    }
}

/// Base trait for model backends (OpenAI-compatible endpoints, scripted mocks, ...)
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Ask the model for its next turn. `messages` starts with the system message.
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<ModelTurn, ProviderError>;
}
