use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use strum_macros::Display;

use super::result::ToolError;

/// JSON type a tool parameter accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub required: bool,
    pub description: String,
}

/// Ordered name to type mapping of the arguments a tool accepts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    params: Vec<Parameter>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required<N, D>(self, name: N, kind: ParamType, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        self.param(name, kind, true, description)
    }

    pub fn optional<N, D>(self, name: N, kind: ParamType, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        self.param(name, kind, false, description)
    }

    fn param<N, D>(mut self, name: N, kind: ParamType, required: bool, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        let name = name.into();
        self.params.retain(|p| p.name != name);
        self.params.push(Parameter {
            name,
            kind,
            required,
            description: description.into(),
        });
        self
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Check `args` before a tool sees them. `null` counts as an empty argument object
    /// and a `null` value for an optional parameter counts as absent.
    pub fn validate(&self, args: &Value) -> Result<(), ToolError> {
        let empty = Map::new();
        let object = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "expected an object of arguments, got {}",
                    other
                )))
            }
        };

        for key in object.keys() {
            if self.get(key).is_none() {
                return Err(ToolError::InvalidArguments(format!(
                    "unknown argument '{}'",
                    key
                )));
            }
        }

        for param in &self.params {
            match object.get(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required argument '{}'",
                        param.name
                    )))
                }
                None | Some(Value::Null) => {}
                Some(value) if !param.kind.matches(value) => {
                    return Err(ToolError::InvalidArguments(format!(
                        "argument '{}' must be of type {}",
                        param.name, param.kind
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Render as the JSON schema object function-calling APIs expect
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.kind,
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_schema() -> ParameterSchema {
        ParameterSchema::new()
            .required("query", ParamType::String, "What to search for")
            .optional("max_results", ParamType::Integer, "How many results")
    }

    #[test]
    fn test_valid_arguments() {
        let schema = search_schema();
        assert!(schema.validate(&json!({"query": "lisbon"})).is_ok());
        assert!(schema
            .validate(&json!({"query": "lisbon", "max_results": 3}))
            .is_ok());
        assert!(schema
            .validate(&json!({"query": "lisbon", "max_results": null}))
            .is_ok());
    }

    #[test]
    fn test_missing_required() {
        let err = search_schema().validate(&json!({})).unwrap_err();
        assert_eq!(
            err,
            ToolError::InvalidArguments("missing required argument 'query'".into())
        );
        assert!(search_schema().validate(&Value::Null).is_err());
    }

    #[test]
    fn test_unknown_key() {
        let err = search_schema()
            .validate(&json!({"query": "x", "page": 2}))
            .unwrap_err();
        assert_eq!(err, ToolError::InvalidArguments("unknown argument 'page'".into()));
    }

    #[test]
    fn test_type_mismatch() {
        assert!(search_schema().validate(&json!({"query": 7})).is_err());
        assert!(search_schema()
            .validate(&json!({"query": "x", "max_results": 2.5}))
            .is_err());
        assert!(search_schema().validate(&json!(["query"])).is_err());
    }

    #[test]
    fn test_empty_schema_accepts_null() {
        assert!(ParameterSchema::new().validate(&Value::Null).is_ok());
    }

    #[test]
    fn test_json_schema_keeps_order_and_required() {
        let schema = search_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["properties"]["max_results"]["type"], "integer");
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn test_redeclaring_replaces() {
        let schema = search_schema().required("max_results", ParamType::Number, "n");
        assert_eq!(schema.params().len(), 2);
        assert!(schema.get("max_results").unwrap().required);
    }
}
