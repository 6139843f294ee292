use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::message::{Message, ToolRequest};
use crate::models::tool::Tool;
use crate::providers::base::{AnswerPart, ModelClient, ModelTurn, ProviderError};

/// One scripted reply of a [`MockProvider`]
#[derive(Debug, Clone)]
pub enum MockTurn {
    /// A final answer streamed as these fragments
    Answer(Vec<String>),
    ToolCalls(Vec<ToolRequest>),
    /// Text fragments that turn out to preface tool calls
    AnswerThenToolCalls(Vec<String>, Vec<ToolRequest>),
    Fail(ProviderError),
    /// Never resolves; useful for exercising cancellation and deadlines
    Hang,
}

impl MockTurn {
    pub fn answer<S: Into<String>>(fragments: impl IntoIterator<Item = S>) -> Self {
        MockTurn::Answer(fragments.into_iter().map(Into::into).collect())
    }
}

/// A mock provider that returns pre-configured turns, for tests and offline runs
pub struct MockProvider {
    turns: Mutex<VecDeque<MockTurn>>,
    fallback: Option<MockTurn>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of turns
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            fallback: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Turn to repeat once the script runs out (an empty answer otherwise)
    pub fn with_fallback(mut self, turn: MockTurn) -> Self {
        self.fallback = Some(turn);
        self
    }

    /// Histories received so far, one per `complete` call
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for MockProvider {
    async fn complete(
        &self,
        _model: &str,
        messages: &[Message],
        _tools: &[Tool],
    ) -> Result<ModelTurn, ProviderError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(messages.to_vec());
        }

        let next = self
            .turns
            .lock()
            .ok()
            .and_then(|mut turns| turns.pop_front())
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| MockTurn::Answer(Vec::new()));

        match next {
            MockTurn::Answer(fragments) => Ok(ModelTurn::FinalAnswer(
                futures::stream::iter(fragments.into_iter().map(|f| Ok(AnswerPart::Text(f))))
                    .boxed(),
            )),
            MockTurn::ToolCalls(calls) => Ok(ModelTurn::ToolCalls(calls)),
            MockTurn::AnswerThenToolCalls(fragments, calls) => {
                let parts = fragments
                    .into_iter()
                    .map(AnswerPart::Text)
                    .chain(std::iter::once(AnswerPart::ToolCalls(calls)))
                    .map(Ok);
                Ok(ModelTurn::FinalAnswer(futures::stream::iter(parts).boxed()))
            }
            MockTurn::Fail(error) => Err(error),
            MockTurn::Hang => futures::future::pending().await,
        }
    }
}
