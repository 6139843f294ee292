use futures::stream::BoxStream;
use futures::{Future, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use crate::errors::{AgentError, AgentResult, ErrorKind};
use crate::models::conversation::Conversation;
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::Tool;
use crate::prompt;
use crate::providers::base::{AnswerPart, ModelClient, ModelTurn, ProviderError};
use crate::tools::{ToolError, ToolInvoker, ToolResult};

/// Where a session is in its reasoning loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Reasoning,
    ToolDispatch,
    Answering,
    Done,
    Failed(ErrorKind),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed(_))
    }
}

/// One piece of streamed output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamFragment {
    pub text: String,
    pub is_tool_call_notice: bool,
    pub is_final: bool,
}

impl StreamFragment {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn notice<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            is_tool_call_notice: true,
            is_final: false,
        }
    }

    /// Empty fragment closing a successful answer
    pub fn final_marker() -> Self {
        Self {
            is_final: true,
            ..Default::default()
        }
    }
}

/// Races a future against cancellation and the session deadline
#[derive(Clone)]
struct Watch {
    cancel: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl Watch {
    fn new(cancel: CancellationToken, budget: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: budget.map(|b| (Instant::now() + b, b)),
        }
    }

    async fn around<F: Future>(&self, fut: F) -> AgentResult<F::Output> {
        let expired = async {
            match self.deadline {
                Some((at, _)) => tokio::time::sleep_until(at).await,
                None => futures::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled),
            _ = expired => Err(AgentError::Timeout(
                self.deadline.map(|(_, budget)| budget).unwrap_or_default(),
            )),
            out = fut => Ok(out),
        }
    }
}

/// Drives one user request through the model and tools.
///
/// A session runs once. Its history lives only as long as the session and is never shared.
pub struct AgentSession {
    config: Arc<AgentConfig>,
    client: Arc<dyn ModelClient>,
    conversation: Conversation,
    state: SessionState,
    cancel: CancellationToken,
    tool_notices: bool,
}

impl AgentSession {
    pub fn new(config: Arc<AgentConfig>, client: Arc<dyn ModelClient>) -> Self {
        let tool_notices = config.flags().show_tool_calls;
        Self {
            config,
            client,
            conversation: Conversation::new(),
            state: SessionState::Idle,
            cancel: CancellationToken::new(),
            tool_notices,
        }
    }

    /// Override the agent's `show_tool_calls` flag for this session
    pub fn with_tool_notices(mut self, on: bool) -> Self {
        self.tool_notices = on;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Cancelling this token stops the session at its next suspension point
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Answer `request`, streaming fragments as they are produced.
    ///
    /// The stream ends after a fragment with `is_final` set, or after a single `Err` when
    /// the session fails. Fragments yielded before a failure remain valid.
    pub fn run<S: Into<String>>(
        &mut self,
        request: S,
    ) -> BoxStream<'_, AgentResult<StreamFragment>> {
        let request = request.into();

        Box::pin(async_stream::stream! {
            if self.state != SessionState::Idle {
                yield Err(AgentError::Internal("a session can only run once".to_string()));
                return;
            }

            if let Err(err) = self.start(&request) {
                self.fail(&err);
                yield Err(err);
                return;
            }

            let limits = self.config.limits();
            let watch = Watch::new(self.cancel.clone(), limits.session_timeout);
            let invoker = ToolInvoker::with_cancellation(limits.tool_timeout, self.cancel.clone());
            let catalog = self.config.tool_catalog();
            let mut rounds = 0;

            loop {
                self.state = SessionState::Reasoning;
                debug!(round = rounds, messages = self.conversation.len(), "reasoning");

                let turn = watch.around(self.complete(&catalog)).await.and_then(|r| r);
                let turn = match turn {
                    Ok(turn) => turn,
                    Err(err) => {
                        self.fail(&err);
                        yield Err(err);
                        return;
                    }
                };

                let (preamble, requests) = match turn {
                    ModelTurn::FinalAnswer(mut parts) => {
                        self.state = SessionState::Answering;
                        let mut answer = String::new();
                        let mut trailing = Vec::new();

                        loop {
                            let next = match watch.around(parts.next()).await {
                                Ok(next) => next,
                                Err(err) => {
                                    self.fail(&err);
                                    yield Err(err);
                                    return;
                                }
                            };
                            match next {
                                None => break,
                                Some(Ok(AnswerPart::Text(fragment))) => {
                                    if fragment.is_empty() {
                                        continue;
                                    }
                                    answer.push_str(&fragment);
                                    yield Ok(StreamFragment::text(fragment));
                                }
                                Some(Ok(AnswerPart::ToolCalls(requests))) => {
                                    trailing.extend(requests);
                                }
                                Some(Err(e)) => {
                                    let err = AgentError::ModelUnavailable {
                                        attempts: 1,
                                        message: format!("answer stream broke off: {}", e),
                                    };
                                    self.fail(&err);
                                    yield Err(err);
                                    return;
                                }
                            }
                        }

                        if trailing.is_empty() {
                            if let Err(err) = self.conversation.push_assistant_text(answer) {
                                self.fail(&err);
                                yield Err(err);
                                return;
                            }
                            self.state = SessionState::Done;
                            debug!(rounds, "session done");
                            yield Ok(StreamFragment::final_marker());
                            return;
                        }
                        debug!(calls = trailing.len(), "answer text led into tool calls");
                        (answer, trailing)
                    }
                    ModelTurn::ToolCalls(requests) => (String::new(), requests),
                };

                if rounds >= limits.max_steps {
                    let err = AgentError::StepLimitExceeded(limits.max_steps);
                    self.fail(&err);
                    yield Err(err);
                    return;
                }
                rounds += 1;

                self.state = SessionState::ToolDispatch;
                let pushed = self
                    .conversation
                    .push_text_and_tool_requests(preamble, requests.clone());
                if let Err(err) = pushed {
                    self.fail(&err);
                    yield Err(err);
                    return;
                }

                if self.tool_notices {
                    for request in &requests {
                        yield Ok(StreamFragment::notice(notice_text(request)));
                    }
                }

                let calls = requests.iter().map(|r| self.dispatch(&invoker, r));
                let results = match watch.around(futures::future::join_all(calls)).await {
                    Ok(results) => results,
                    Err(err) => {
                        self.fail(&err);
                        yield Err(err);
                        return;
                    }
                };

                if results.iter().any(|r| r.error == Some(ToolError::Cancelled)) {
                    let err = AgentError::Cancelled;
                    self.fail(&err);
                    yield Err(err);
                    return;
                }

                for (request, result) in requests.iter().zip(results) {
                    if let Err(err) = self.conversation.push_tool_result(&request.id, result) {
                        self.fail(&err);
                        yield Err(err);
                        return;
                    }
                }
            }
        })
    }

    fn start(&mut self, request: &str) -> AgentResult<()> {
        if request.trim().is_empty() {
            return Err(AgentError::Configuration(
                "request must not be empty".to_string(),
            ));
        }
        let system = prompt::assemble(&self.config, None)?;
        self.conversation.push_system(system)?;
        self.conversation.push_user(request)?;
        Ok(())
    }

    fn fail(&mut self, err: &AgentError) {
        warn!(error = %err, state = ?self.state, "session failed");
        self.state = SessionState::Failed(err.kind());
    }

    /// Ask the model for its next turn, retrying while the backend is unavailable.
    ///
    /// A tool call turn that names no tools is a malformed response.
    async fn complete(&self, catalog: &[Tool]) -> AgentResult<ModelTurn> {
        let policy = self.config.retry_policy();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let result = self
                .client
                .complete(self.config.model_ref(), self.conversation.messages(), catalog)
                .await
                .and_then(|turn| match turn {
                    ModelTurn::ToolCalls(requests) if requests.is_empty() => {
                        Err(ProviderError::InvalidResponse(
                            "tool call turn without any tool calls".to_string(),
                        ))
                    }
                    turn => Ok(turn),
                });

            match result {
                Ok(turn) => return Ok(turn),
                Err(e) if e.is_retryable() && attempts <= policy.max_retries => {
                    let delay = policy.delay_for(attempts);
                    warn!(attempt = attempts, ?delay, error = %e, "model unavailable, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(AgentError::ModelUnavailable {
                        attempts,
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    async fn dispatch(&self, invoker: &ToolInvoker, request: &ToolRequest) -> ToolResult {
        let call = match &request.tool_call {
            Ok(call) => call,
            Err(e) => {
                warn!(id = %request.id, error = %e, "model sent a malformed tool call");
                return ToolResult::failure(e.clone());
            }
        };

        let Some(binding) = self.config.find_tool(&call.name) else {
            warn!(id = %request.id, tool = %call.name, "model called an unknown tool");
            return ToolResult::failure(ToolError::InvalidArguments(format!(
                "no tool named '{}' is available",
                call.name
            )));
        };

        info!(id = %request.id, call = %call.summary(), "calling tool");
        let result = invoker.invoke(binding, call.arguments.clone()).await;
        info!(id = %request.id, tool = %call.name, ok = result.ok, "tool returned");
        result
    }
}

fn notice_text(request: &ToolRequest) -> String {
    match &request.tool_call {
        Ok(call) => format!("Running {}\n", call.summary()),
        Err(e) => format!("Skipping malformed tool call: {}\n", e),
    }
}
