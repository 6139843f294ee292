use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
/// Payload produced by a tool, either plain text or structured data
pub enum Content {
    Text(TextContent),
    Json { value: Value },
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text(TextContent { text: text.into() })
    }

    pub fn json(value: Value) -> Self {
        Content::Json { value }
    }

    /// Get the text content if this is a Text variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    /// Get the structured value if this is a Json variant
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Content::Json { value } => Some(value),
            _ => None,
        }
    }

    /// Render the payload as the text a model will read
    pub fn render(&self) -> String {
        match self {
            Content::Text(text) => text.text.clone(),
            Content::Json { value } => match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::text(text)
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::json(value)
    }
}
