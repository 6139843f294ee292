use futures::stream::{BoxStream, Stream};
use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

use super::config::AgentConfig;
use super::session::{AgentSession, StreamFragment};
use crate::errors::{AgentError, AgentResult};
use crate::providers::base::ModelClient;

/// Per-call overrides for [`run_with_options`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Include tool call notices in the stream; the agent's `show_tool_calls` flag when unset
    pub include_tool_notices: Option<bool>,
}

/// A running request: the fragment stream plus a handle to cancel it
pub struct AgentRun {
    stream: BoxStream<'static, AgentResult<StreamFragment>>,
    cancel: CancellationToken,
}

impl AgentRun {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Stream for AgentRun {
    type Item = AgentResult<StreamFragment>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }
}

/// Start answering `request` with a fresh session. Nothing happens until the stream is polled.
pub fn run<S: Into<String>>(
    config: Arc<AgentConfig>,
    client: Arc<dyn ModelClient>,
    request: S,
) -> AgentRun {
    run_with_options(config, client, request, RunOptions::default())
}

pub fn run_with_options<S: Into<String>>(
    config: Arc<AgentConfig>,
    client: Arc<dyn ModelClient>,
    request: S,
    options: RunOptions,
) -> AgentRun {
    let mut session = AgentSession::new(config, client);
    if let Some(on) = options.include_tool_notices {
        session = session.with_tool_notices(on);
    }
    let cancel = session.cancellation_token();
    let request = request.into();

    let stream = async_stream::stream! {
        let mut session = session;
        let mut fragments = session.run(request);
        while let Some(item) = fragments.next().await {
            yield item;
        }
    };

    AgentRun {
        stream: Box::pin(stream),
        cancel,
    }
}

/// Run a request and return the whole answer, without tool notices
pub async fn run_to_completion<S: Into<String>>(
    config: Arc<AgentConfig>,
    client: Arc<dyn ModelClient>,
    request: S,
) -> Result<String, AgentError> {
    let options = RunOptions {
        include_tool_notices: Some(false),
    };
    let mut fragments = run_with_options(config, client, request, options);
    let mut answer = String::new();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        if !fragment.is_tool_call_notice {
            answer.push_str(&fragment.text);
        }
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::ToolRequest;
    use crate::models::tool::ToolCall;
    use crate::providers::mock::{MockProvider, MockTurn};
    use serde_json::json;

    fn config(show_tool_calls: bool) -> Arc<AgentConfig> {
        Arc::new(
            AgentConfig::builder("mock")
                .description("You are a recipe assistant")
                .instruction("Suggest one dish")
                .show_tool_calls(show_tool_calls)
                .build()
                .unwrap(),
        )
    }

    fn script() -> Arc<MockProvider> {
        Arc::new(MockProvider::new(vec![
            MockTurn::ToolCalls(vec![ToolRequest::new(
                "call_1",
                Ok(ToolCall::new("pantry", json!({}))),
            )]),
            MockTurn::answer(["Make ", "shakshuka"]),
        ]))
    }

    #[tokio::test]
    async fn test_run_to_completion_skips_notices() {
        let answer = run_to_completion(config(true), script(), "Dinner idea?")
            .await
            .unwrap();
        assert_eq!(answer, "Make shakshuka");
    }

    #[tokio::test]
    async fn test_notice_override() {
        let shown: Vec<_> = run(config(true), script(), "Dinner idea?").collect().await;
        assert!(shown.iter().any(|f| f.as_ref().unwrap().is_tool_call_notice));

        let options = RunOptions {
            include_tool_notices: Some(false),
        };
        let hidden: Vec<_> = run_with_options(config(true), script(), "Dinner idea?", options)
            .collect()
            .await;
        assert!(hidden.iter().all(|f| !f.as_ref().unwrap().is_tool_call_notice));

        let options = RunOptions {
            include_tool_notices: Some(true),
        };
        let forced: Vec<_> = run_with_options(config(false), script(), "Dinner idea?", options)
            .collect()
            .await;
        assert!(forced.iter().any(|f| f.as_ref().unwrap().is_tool_call_notice));
    }

    #[tokio::test]
    async fn test_cancel_handle() {
        let client = Arc::new(MockProvider::new(vec![MockTurn::Hang]));
        let mut fragments = run(config(false), client, "Dinner idea?");
        fragments.cancel();
        assert_eq!(fragments.next().await, Some(Err(AgentError::Cancelled)));
        assert_eq!(fragments.next().await, None);
    }

    #[tokio::test]
    async fn test_failure_surfaces_as_error() {
        let client = Arc::new(MockProvider::new(vec![]).with_fallback(MockTurn::ToolCalls(
            vec![ToolRequest::new("call", Ok(ToolCall::new("pantry", json!({}))))],
        )));
        let err = run_to_completion(config(false), client, "Dinner idea?")
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::StepLimitExceeded(10));
    }
}
