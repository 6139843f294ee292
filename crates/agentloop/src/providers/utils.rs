use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};

use super::base::ProviderError;
use crate::models::message::{Message, MessageContent, ToolRequest};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::tools::ToolError;

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Placeholder name used on the wire for tool calls the model garbled
pub const INVALID_TOOL_CALL: &str = "invalid_tool_call";

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });
        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.text.is_empty() || message.role == Role::Assistant {
                        converted["content"] = json!(text.text);
                    }
                }
                MessageContent::ToolRequest(request) => {
                    let (name, arguments) = match &request.tool_call {
                        Ok(tool_call) => (
                            sanitize_function_name(&tool_call.name),
                            tool_call.arguments.to_string(),
                        ),
                        Err(_) => (INVALID_TOOL_CALL.to_string(), "{}".to_string()),
                    };
                    let entry = json!({
                        "id": request.id,
                        "type": "function",
                        "function": {
                            "name": name,
                            "arguments": arguments,
                        }
                    });
                    match converted.get_mut("tool_calls").and_then(Value::as_array_mut) {
                        Some(calls) => calls.push(entry),
                        None => converted["tool_calls"] = json!([entry]),
                    }
                }
                MessageContent::ToolResponse(response) => {
                    // A failed result already carries the error text in its payload
                    output.push(json!({
                        "role": "tool",
                        "content": response.tool_result.payload.render(),
                        "tool_call_id": response.id
                    }));
                }
            }
        }

        if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
            output.insert(0, converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>, ProviderError> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(ProviderError::Request(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

pub fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

pub fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Reassembles tool calls from streamed `delta.tool_calls` fragments.
///
/// Fragments are keyed by their `index`; ids and names arrive once, argument text arrives
/// in pieces that are concatenated.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u64, PartialCall>,
}

impl ToolCallAccumulator {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn absorb(&mut self, deltas: &[Value]) {
        for (position, delta) in deltas.iter().enumerate() {
            let index = delta["index"].as_u64().unwrap_or(position as u64);
            let call = self.calls.entry(index).or_default();
            if let Some(id) = delta["id"].as_str().filter(|s| !s.is_empty()) {
                call.id = id.to_string();
            }
            if let Some(name) = delta["function"]["name"].as_str() {
                call.name.push_str(name);
            }
            if let Some(arguments) = delta["function"]["arguments"].as_str() {
                call.arguments.push_str(arguments);
            }
        }
    }

    /// Finish into requests; calls naming no known tool or carrying unparsable
    /// arguments become failed requests
    pub fn finish(self, tools: &[Tool]) -> Vec<ToolRequest> {
        self.calls
            .into_values()
            .map(|call| {
                let id = if call.id.is_empty() {
                    format!("call_{}", uuid::Uuid::new_v4().simple())
                } else {
                    call.id
                };
                ToolRequest::new(id, parse_call(&call.name, &call.arguments, tools))
            })
            .collect()
    }
}

fn parse_call(name: &str, arguments: &str, tools: &[Tool]) -> Result<ToolCall, ToolError> {
    if !is_valid_function_name(name) {
        return Err(ToolError::InvalidArguments(format!(
            "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
            name
        )));
    }
    if !tools.iter().any(|t| t.name == name) {
        return Err(ToolError::InvalidArguments(format!(
            "'{}' is not one of the available tools",
            name
        )));
    }
    let arguments = if arguments.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str::<Value>(arguments).map_err(|e| {
            ToolError::InvalidArguments(format!(
                "Could not interpret arguments for '{}': {}",
                name, e
            ))
        })?
    };
    Ok(ToolCall::new(name, arguments))
}

/// Parse one `data:` payload of a chat completions stream
pub fn parse_stream_chunk(data: &str) -> Result<Value, ProviderError> {
    let chunk: Value = serde_json::from_str(data)
        .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", e, data)))?;
    if let Some(error) = chunk.get("error") {
        return Err(ProviderError::Request(format!("OpenAI API error: {}", error)));
    }
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::Content;
    use crate::tools::ToolResult;

    fn search_tool() -> Tool {
        Tool::new(
            "web_search",
            "Search the web",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        )
    }

    #[test]
    fn test_messages_to_openai_spec() {
        let message = Message::user().with_text("Hello");
        let spec = messages_to_openai_spec(&[message]);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "user");
        assert_eq!(spec[0]["content"], "Hello");
    }

    #[test]
    fn test_messages_to_openai_spec_complex() {
        let messages = vec![
            Message::system().with_text("You are a travel advisor"),
            Message::user().with_text("Plan a trip"),
            Message::assistant()
                .with_tool_request(
                    "call_1",
                    Ok(ToolCall::new("web_search", json!({"query": "lisbon"}))),
                )
                .with_tool_request(
                    "call_2",
                    Err(ToolError::InvalidArguments("bad json".into())),
                ),
            Message::tool().with_tool_response("call_1", ToolResult::ok(Content::text("Result"))),
            Message::tool().with_tool_response(
                "call_2",
                ToolResult::failure(ToolError::InvalidArguments("bad json".into())),
            ),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 5);
        assert_eq!(spec[0]["role"], "system");
        assert_eq!(spec[1]["content"], "Plan a trip");
        assert_eq!(spec[2]["role"], "assistant");
        assert_eq!(spec[2]["tool_calls"][0]["function"]["name"], "web_search");
        assert_eq!(
            spec[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"query":"lisbon"}"#
        );
        assert_eq!(spec[2]["tool_calls"][1]["function"]["name"], INVALID_TOOL_CALL);
        assert_eq!(spec[3]["role"], "tool");
        assert_eq!(spec[3]["content"], "Result");
        assert_eq!(spec[3]["tool_call_id"], spec[2]["tool_calls"][0]["id"]);
        assert!(spec[4]["content"].as_str().unwrap().contains("bad json"));
    }

    #[test]
    fn test_tools_to_openai_spec() {
        let spec = tools_to_openai_spec(&[search_tool()]).unwrap();
        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "web_search");
    }

    #[test]
    fn test_tools_to_openai_spec_duplicate() {
        let result = tools_to_openai_spec(&[search_tool(), search_tool()]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_sanitize_function_name() {
        assert_eq!(sanitize_function_name("hello-world"), "hello-world");
        assert_eq!(sanitize_function_name("hello world"), "hello_world");
        assert_eq!(sanitize_function_name("hello@world"), "hello_world");
    }

    #[test]
    fn test_is_valid_function_name() {
        assert!(is_valid_function_name("hello-world"));
        assert!(is_valid_function_name("hello_world"));
        assert!(!is_valid_function_name("hello world"));
        assert!(!is_valid_function_name("hello@world"));
        assert!(!is_valid_function_name(""));
    }

    #[test]
    fn test_accumulator_joins_fragments() {
        let mut acc = ToolCallAccumulator::default();
        acc.absorb(&[json!({"index": 0, "id": "call_a", "function": {"name": "web_search", "arguments": "{\"que"}})]);
        acc.absorb(&[json!({"index": 1, "id": "call_b", "function": {"name": "web_search", "arguments": ""}})]);
        acc.absorb(&[json!({"index": 0, "function": {"arguments": "ry\": \"lisbon\"}"}})]);
        acc.absorb(&[json!({"index": 1, "function": {"arguments": "{\"query\": \"porto\"}"}})]);

        let requests = acc.finish(&[search_tool()]);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].id, "call_a");
        assert_eq!(
            requests[0].tool_call,
            Ok(ToolCall::new("web_search", json!({"query": "lisbon"})))
        );
        assert_eq!(
            requests[1].tool_call,
            Ok(ToolCall::new("web_search", json!({"query": "porto"})))
        );
    }

    #[test]
    fn test_accumulator_flags_malformed_calls() {
        let mut acc = ToolCallAccumulator::default();
        acc.absorb(&[
            json!({"index": 0, "id": "a", "function": {"name": "web_search", "arguments": "{not json"}}),
            json!({"index": 1, "id": "b", "function": {"name": "teleport", "arguments": "{}"}}),
            json!({"index": 2, "function": {"name": "bad name", "arguments": "{}"}}),
        ]);
        let requests = acc.finish(&[search_tool()]);
        assert!(requests
            .iter()
            .all(|r| matches!(r.tool_call, Err(ToolError::InvalidArguments(_)))));
        assert!(requests[2].id.starts_with("call_"));
    }

    #[test]
    fn test_parse_stream_chunk_error() {
        let err = parse_stream_chunk(r#"{"error": {"message": "quota"}}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
        assert!(matches!(
            parse_stream_chunk("not json"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
