use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use super::schema::ParameterSchema;
use crate::models::content::Content;
use crate::models::tool::Tool;

/// Core trait that defines a capability a model can call.
///
/// Bindings are shared read-only between sessions, so they must not keep per-call state.
/// Arguments are validated against [`ToolBinding::parameter_schema`] before `invoke` runs.
#[async_trait]
pub trait ToolBinding: Send + Sync {
    /// Get the name the model uses to call this tool
    fn name(&self) -> &str;

    /// Get the description shown to the model
    fn description(&self) -> &str;

    /// Get the arguments this tool accepts
    fn parameter_schema(&self) -> &ParameterSchema;

    /// Run the tool. Errors become a failed result the model gets to read.
    async fn invoke(&self, args: Value) -> Result<Content>;

    /// Catalog entry advertised to the model
    fn as_tool(&self) -> Tool {
        Tool::new(
            self.name(),
            self.description(),
            self.parameter_schema().to_json_schema(),
        )
    }
}

type Handler = dyn Fn(Value) -> BoxFuture<'static, Result<Content>> + Send + Sync;

/// A binding backed by a closure
pub struct FunctionTool {
    name: String,
    description: String,
    schema: ParameterSchema,
    handler: Box<Handler>,
}

impl FunctionTool {
    pub fn new<N, D, F>(name: N, description: D, schema: ParameterSchema, handler: F) -> Self
    where
        N: Into<String>,
        D: Into<String>,
        F: Fn(Value) -> BoxFuture<'static, Result<Content>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl ToolBinding for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameter_schema(&self) -> &ParameterSchema {
        &self.schema
    }

    async fn invoke(&self, args: Value) -> Result<Content> {
        (self.handler)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::ParamType;
    use futures::FutureExt;
    use serde_json::json;

    fn word_count() -> FunctionTool {
        FunctionTool::new(
            "count_words",
            "Count the number of words in text",
            ParameterSchema::new().required("text", ParamType::String, "The text to count"),
            |args| {
                async move {
                    let text = args["text"].as_str().unwrap_or_default();
                    Ok(Content::json(json!({ "count": text.split_whitespace().count() })))
                }
                .boxed()
            },
        )
    }

    #[tokio::test]
    async fn test_function_tool_invoke() {
        let tool = word_count();
        let result = tool.invoke(json!({"text": "one two three"})).await.unwrap();
        assert_eq!(result.as_json(), Some(&json!({"count": 3})));
    }

    #[test]
    fn test_as_tool_catalog_entry() {
        let tool = word_count().as_tool();
        assert_eq!(tool.name, "count_words");
        assert_eq!(tool.description, "Count the number of words in text");
        assert_eq!(tool.input_schema["required"], json!(["text"]));
    }
}
