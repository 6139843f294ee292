use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::base::{AnswerPart, ModelClient, ModelTurn, ProviderError, TextStream};
use super::configs::OpenAiProviderConfig;
use super::utils::{
    messages_to_openai_spec, parse_stream_chunk, tools_to_openai_spec, ToolCallAccumulator,
};
use crate::models::message::Message;
use crate::models::tool::Tool;

type DataStream = BoxStream<'static, Result<String, ProviderError>>;

/// Streaming client for OpenAI-compatible chat completions endpoints
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn build_payload(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<Value, ProviderError> {
        let mut payload = json!({
            "model": model,
            "messages": messages_to_openai_spec(messages),
            "stream": true,
        });

        if !tools.is_empty() {
            payload["tools"] = json!(tools_to_openai_spec(tools)?);
        }
        if let Some(temp) = self.config.temperature {
            payload["temperature"] = json!(temp);
        }
        if let Some(tokens) = self.config.max_tokens {
            payload["max_tokens"] = json!(tokens);
        }
        Ok(payload)
    }

    fn open_stream(&self, payload: &Value) -> Result<DataStream, ProviderError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );
        let mut request = self.client.post(&url).json(payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        let source = EventSource::new(request)
            .map_err(|e| ProviderError::Request(format!("cannot stream request: {}", e)))?;
        Ok(event_data(source))
    }
}

#[async_trait]
impl ModelClient for OpenAiProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<ModelTurn, ProviderError> {
        let payload = self.build_payload(model, messages, tools)?;
        debug!(%model, messages = messages.len(), tools = tools.len(), "requesting completion");
        let events = self.open_stream(&payload)?;
        decode_turn(events, tools).await
    }
}

/// Yield the `data` field of each server-sent event until `[DONE]` or the first error
fn event_data(mut source: EventSource) -> DataStream {
    Box::pin(async_stream::stream! {
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    if message.data.trim() == "[DONE]" {
                        break;
                    }
                    yield Ok(message.data);
                }
                Err(EventSourceError::StreamEnded) => break,
                Err(e) => {
                    yield Err(map_event_error(e));
                    break;
                }
            }
        }
        // Stop the event source from reconnecting
        source.close();
    })
}

fn map_event_error(error: EventSourceError) -> ProviderError {
    match error {
        EventSourceError::InvalidStatusCode(status, _) => {
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                ProviderError::Unavailable(format!("Server error: {}", status))
            } else {
                ProviderError::Request(format!("Request failed: {}", status))
            }
        }
        EventSourceError::Transport(e) => ProviderError::Unavailable(e.to_string()),
        EventSourceError::InvalidContentType(content_type, _) => ProviderError::InvalidResponse(
            format!("unexpected content type {:?}", content_type),
        ),
        other => ProviderError::InvalidResponse(other.to_string()),
    }
}

/// Read the stream until the turn kind is known.
///
/// The first non-empty content delta makes this a final answer and the rest of the stream is
/// handed to the caller as it arrives. Tool call deltas are collected until the stream ends,
/// and tool calls that follow answer text close the answer stream as [`AnswerPart::ToolCalls`].
async fn decode_turn(mut events: DataStream, tools: &[Tool]) -> Result<ModelTurn, ProviderError> {
    let mut calls = ToolCallAccumulator::default();

    while let Some(data) = events.next().await {
        let chunk = parse_stream_chunk(&data?)?;
        let delta = &chunk["choices"][0]["delta"];

        if let Some(tool_calls) = delta["tool_calls"].as_array() {
            calls.absorb(tool_calls);
            continue;
        }

        if let Some(text) = delta["content"].as_str() {
            if !text.is_empty() && calls.is_empty() {
                let first = stream::once(futures::future::ready(Ok(AnswerPart::text(text))));
                let rest = answer_text(events, tools.to_vec());
                return Ok(ModelTurn::FinalAnswer(first.chain(rest).boxed()));
            }
        }
    }

    if calls.is_empty() {
        Ok(ModelTurn::FinalAnswer(stream::empty().boxed()))
    } else {
        Ok(ModelTurn::ToolCalls(calls.finish(tools)))
    }
}

fn answer_text(mut events: DataStream, tools: Vec<Tool>) -> TextStream {
    Box::pin(async_stream::stream! {
        let mut calls = ToolCallAccumulator::default();

        while let Some(data) = events.next().await {
            let chunk = match data.and_then(|d| parse_stream_chunk(&d)) {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let delta = &chunk["choices"][0]["delta"];
            if let Some(tool_calls) = delta["tool_calls"].as_array() {
                calls.absorb(tool_calls);
                continue;
            }
            if let Some(text) = delta["content"].as_str().filter(|t| !t.is_empty()) {
                yield Ok(AnswerPart::text(text));
            }
        }

        if !calls.is_empty() {
            debug!("answer text was followed by tool calls");
            yield Ok(AnswerPart::ToolCalls(calls.finish(&tools)));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::ToolCall;
    use futures::TryStreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body(chunks: &[Value]) -> String {
        let mut body: String = chunks
            .iter()
            .map(|chunk| format!("data: {}\n\n", chunk))
            .collect();
        body.push_str("data: [DONE]\n\n");
        body
    }

    fn content_chunk(text: &str) -> Value {
        json!({"choices": [{"index": 0, "delta": {"content": text}}]})
    }

    fn weather_tool() -> Tool {
        Tool::new(
            "get_weather",
            "Gets the current weather for a location",
            json!({
                "type": "object",
                "properties": {"location": {"type": "string"}},
                "required": ["location"]
            }),
        )
    }

    async fn setup_mock_server(template: ResponseTemplate) -> (MockServer, OpenAiProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test_api_key"))
            .and(body_partial_json(json!({"model": "gpt-4o", "stream": true})))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        let provider = OpenAiProvider::new(OpenAiProviderConfig {
            host: mock_server.uri(),
            api_key: Some("test_api_key".to_string()),
            temperature: Some(0.7),
            max_tokens: None,
        })
        .unwrap();
        (mock_server, provider)
    }

    fn sse(chunks: &[Value]) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(sse_body(chunks), "text/event-stream")
    }

    #[tokio::test]
    async fn test_complete_streams_answer() -> anyhow::Result<()> {
        let (_server, provider) = setup_mock_server(sse(&[
            json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}}]}),
            content_chunk("Hello! "),
            content_chunk("How can I help?"),
        ]))
        .await;

        let messages = vec![
            Message::system().with_text("You are a helpful assistant."),
            Message::user().with_text("Hello?"),
        ];
        match provider.complete("gpt-4o", &messages, &[]).await? {
            ModelTurn::FinalAnswer(stream) => {
                let parts: Vec<AnswerPart> = stream.try_collect().await?;
                assert_eq!(
                    parts,
                    vec![AnswerPart::text("Hello! "), AnswerPart::text("How can I help?")]
                );
            }
            other => panic!("Expected final answer, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_tool_request() -> anyhow::Result<()> {
        let (_server, provider) = setup_mock_server(sse(&[
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_123", "type": "function",
                 "function": {"name": "get_weather", "arguments": ""}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "{\"location\":\"San Francisco, CA\"}"}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
        ]))
        .await;

        let messages = vec![Message::user().with_text("What's the weather in San Francisco?")];
        match provider
            .complete("gpt-4o", &messages, &[weather_tool()])
            .await?
        {
            ModelTurn::ToolCalls(requests) => {
                assert_eq!(requests.len(), 1);
                assert_eq!(requests[0].id, "call_123");
                assert_eq!(
                    requests[0].tool_call,
                    Ok(ToolCall::new(
                        "get_weather",
                        json!({"location": "San Francisco, CA"})
                    ))
                );
            }
            other => panic!("Expected tool calls, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_text_then_tool_call_keeps_the_call() -> anyhow::Result<()> {
        let search = Tool::new(
            "web_search",
            "Search the web",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        );
        let (_server, provider) = setup_mock_server(sse(&[
            json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}}]}),
            content_chunk("Let me search."),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_7", "type": "function",
                 "function": {"name": "web_search", "arguments": "{\"query\":"}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "\"Lisbon weather\"}"}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
        ]))
        .await;

        let messages = vec![Message::user().with_text("What's the weather in Lisbon?")];
        match provider.complete("gpt-4o", &messages, &[search]).await? {
            ModelTurn::FinalAnswer(stream) => {
                let parts: Vec<AnswerPart> = stream.try_collect().await?;
                assert_eq!(parts.len(), 2, "got {:?}", parts);
                assert_eq!(parts[0], AnswerPart::text("Let me search."));
                let AnswerPart::ToolCalls(requests) = &parts[1] else {
                    panic!("Expected trailing tool calls, got {:?}", parts[1]);
                };
                assert_eq!(requests.len(), 1);
                assert_eq!(requests[0].id, "call_7");
                assert_eq!(
                    requests[0].tool_call,
                    Ok(ToolCall::new("web_search", json!({"query": "Lisbon weather"})))
                );
            }
            other => panic!("Expected an answer stream, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let (_server, provider) = setup_mock_server(ResponseTemplate::new(503)).await;
        let err = provider
            .complete("gpt-4o", &[Message::user().with_text("Hi")], &[])
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retryable() {
        let (_server, provider) = setup_mock_server(ResponseTemplate::new(401)).await;
        let err = provider
            .complete("gpt-4o", &[Message::user().with_text("Hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_decode_empty_stream_is_empty_answer() -> anyhow::Result<()> {
        let events: DataStream = stream::empty().boxed();
        match decode_turn(events, &[]).await? {
            ModelTurn::FinalAnswer(stream) => {
                let parts: Vec<AnswerPart> = stream.try_collect().await?;
                assert!(parts.is_empty());
            }
            other => panic!("Expected final answer, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_decode_mid_stream_error_reaches_caller() -> anyhow::Result<()> {
        let events: DataStream = stream::iter(vec![
            Ok(content_chunk("partial").to_string()),
            Err(ProviderError::Unavailable("connection reset".into())),
        ])
        .boxed();
        match decode_turn(events, &[]).await? {
            ModelTurn::FinalAnswer(mut stream) => {
                assert_eq!(stream.next().await, Some(Ok(AnswerPart::text("partial"))));
                assert!(matches!(
                    stream.next().await,
                    Some(Err(ProviderError::Unavailable(_)))
                ));
                assert_eq!(stream.next().await, None);
            }
            other => panic!("Expected final answer, got {:?}", other),
        }
        Ok(())
    }
}
