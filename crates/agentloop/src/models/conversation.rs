use std::collections::VecDeque;

use super::message::{Message, ToolRequest};
use crate::errors::{AgentError, AgentResult};
use crate::tools::ToolResult;

/// Append-only message history owned by a single session.
///
/// Tool results must answer the outstanding tool requests one by one, in the order the
/// requests were made, and no assistant message may be appended while any are outstanding.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    pending: VecDeque<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Ids of tool requests that still wait for a result
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn push_system<S: Into<String>>(&mut self, text: S) -> AgentResult<()> {
        if !self.messages.is_empty() {
            return Err(AgentError::Internal(
                "system message must open the conversation".to_string(),
            ));
        }
        self.messages.push(Message::system().with_text(text));
        Ok(())
    }

    pub fn push_user<S: Into<String>>(&mut self, text: S) -> AgentResult<()> {
        self.ensure_settled("user message")?;
        self.messages.push(Message::user().with_text(text));
        Ok(())
    }

    pub fn push_assistant_text<S: Into<String>>(&mut self, text: S) -> AgentResult<()> {
        self.ensure_settled("assistant message")?;
        self.messages.push(Message::assistant().with_text(text));
        Ok(())
    }

    pub fn push_tool_requests(&mut self, requests: Vec<ToolRequest>) -> AgentResult<()> {
        self.push_text_and_tool_requests(String::new(), requests)
    }

    /// Append one assistant message holding `text` followed by `requests`
    pub fn push_text_and_tool_requests<S: Into<String>>(
        &mut self,
        text: S,
        requests: Vec<ToolRequest>,
    ) -> AgentResult<()> {
        self.ensure_settled("tool request")?;
        if requests.is_empty() {
            return Err(AgentError::Internal(
                "tool request message without requests".to_string(),
            ));
        }
        let text = text.into();
        let mut message = Message::assistant();
        if !text.is_empty() {
            message = message.with_text(text);
        }
        for request in requests {
            self.pending.push_back(request.id.clone());
            message = message.with_tool_request(request.id, request.tool_call);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Append the result for the oldest outstanding request, which must be `id`
    pub fn push_tool_result(&mut self, id: &str, result: ToolResult) -> AgentResult<()> {
        match self.pending.front() {
            Some(expected) if expected == id => {
                self.pending.pop_front();
                self.messages
                    .push(Message::tool().with_tool_response(id, result));
                Ok(())
            }
            Some(expected) => Err(AgentError::Internal(format!(
                "tool result '{}' arrived while '{}' is next",
                id, expected
            ))),
            None => Err(AgentError::Internal(format!(
                "tool result '{}' has no matching request",
                id
            ))),
        }
    }

    fn ensure_settled(&self, what: &str) -> AgentResult<()> {
        if let Some(id) = self.pending.front() {
            return Err(AgentError::Internal(format!(
                "cannot append {} while tool request '{}' awaits its result",
                what, id
            )));
        }
        Ok(())
    }
}
