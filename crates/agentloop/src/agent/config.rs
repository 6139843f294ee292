use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;
use crate::prompt;
use crate::providers::retry::RetryPolicy;
use crate::providers::utils::is_valid_function_name;
use crate::tools::ToolBinding;

pub const DEFAULT_MAX_STEPS: usize = 10;
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Presentation switches of an agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentFlags {
    /// Ask the model to format answers as markdown
    pub markdown: bool,
    /// Emit a notice fragment for every tool call
    pub show_tool_calls: bool,
    /// Put the current time in the system prompt
    pub add_datetime: bool,
}

/// Bounds on how long and how far a session may go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Tool dispatch rounds allowed before the session fails
    pub max_steps: usize,
    pub tool_timeout: Duration,
    /// Deadline for the whole session, none by default
    pub session_timeout: Option<Duration>,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            session_timeout: None,
        }
    }
}

/// Everything a session needs to know about an agent.
///
/// Built once through [`AgentConfig::builder`] and never changed afterwards; sessions share
/// it behind an `Arc`.
#[derive(Clone)]
pub struct AgentConfig {
    model_ref: String,
    description: String,
    instructions: Vec<String>,
    tools: Vec<Arc<dyn ToolBinding>>,
    flags: AgentFlags,
    limits: SessionLimits,
    retry_policy: RetryPolicy,
    system_template: Option<String>,
}

impl AgentConfig {
    pub fn builder<S: Into<String>>(model_ref: S) -> AgentConfigBuilder {
        AgentConfigBuilder {
            config: AgentConfig {
                model_ref: model_ref.into(),
                description: String::new(),
                instructions: Vec::new(),
                tools: Vec::new(),
                flags: AgentFlags::default(),
                limits: SessionLimits::default(),
                retry_policy: RetryPolicy::default(),
                system_template: None,
            },
        }
    }

    pub fn model_ref(&self) -> &str {
        &self.model_ref
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instructions(&self) -> &[String] {
        &self.instructions
    }

    pub fn tools(&self) -> &[Arc<dyn ToolBinding>] {
        &self.tools
    }

    pub fn flags(&self) -> AgentFlags {
        self.flags
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub fn system_template(&self) -> Option<&str> {
        self.system_template.as_deref()
    }

    /// Tool descriptions as offered to the model, in binding order
    pub fn tool_catalog(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.as_tool()).collect()
    }

    pub fn find_tool(&self, name: &str) -> Option<Arc<dyn ToolBinding>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("model_ref", &self.model_ref)
            .field("description", &self.description)
            .field("instructions", &self.instructions)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("flags", &self.flags)
            .field("limits", &self.limits)
            .field("retry_policy", &self.retry_policy)
            .field("custom_template", &self.system_template.is_some())
            .finish()
    }
}

pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.config.description = description.into();
        self
    }

    /// Append one instruction block; blocks keep the order they are added in
    pub fn instruction<S: Into<String>>(mut self, instruction: S) -> Self {
        self.config.instructions.push(instruction.into());
        self
    }

    pub fn instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .instructions
            .extend(instructions.into_iter().map(Into::into));
        self
    }

    pub fn tool(mut self, tool: Arc<dyn ToolBinding>) -> Self {
        self.config.tools.push(tool);
        self
    }

    pub fn markdown(mut self, on: bool) -> Self {
        self.config.flags.markdown = on;
        self
    }

    pub fn show_tool_calls(mut self, on: bool) -> Self {
        self.config.flags.show_tool_calls = on;
        self
    }

    pub fn add_datetime(mut self, on: bool) -> Self {
        self.config.flags.add_datetime = on;
        self
    }

    pub fn max_steps(mut self, steps: usize) -> Self {
        self.config.limits.max_steps = steps;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.limits.tool_timeout = timeout;
        self
    }

    pub fn session_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.limits.session_timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry_policy = policy;
        self
    }

    /// Replace the built-in system prompt template with a tera template of the same shape
    pub fn system_template<S: Into<String>>(mut self, template: S) -> Self {
        self.config.system_template = Some(template.into());
        self
    }

    pub fn build(self) -> AgentResult<AgentConfig> {
        let config = self.config;

        if config.model_ref.trim().is_empty() {
            return Err(AgentError::Configuration(
                "model reference must not be empty".to_string(),
            ));
        }
        prompt::validate_persona(&config.description, &config.instructions)?;

        let mut seen = HashSet::new();
        for tool in &config.tools {
            let name = tool.name();
            if !is_valid_function_name(name) {
                return Err(AgentError::Configuration(format!(
                    "tool name '{}' may only use letters, digits, '_' and '-'",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(AgentError::Configuration(format!(
                    "tool '{}' is bound more than once",
                    name
                )));
            }
        }

        if config.limits.tool_timeout.is_zero() {
            return Err(AgentError::Configuration(
                "tool timeout must be greater than zero".to_string(),
            ));
        }
        if config.limits.session_timeout.is_some_and(|t| t.is_zero()) {
            return Err(AgentError::Configuration(
                "session timeout must be greater than zero".to_string(),
            ));
        }

        // Catches a broken custom template before any session starts
        prompt::assemble(&config, None)?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::Content;
    use crate::tools::{FunctionTool, ParamType, ParameterSchema};
    use futures::FutureExt;

    fn tool(name: &str) -> Arc<dyn ToolBinding> {
        Arc::new(FunctionTool::new(
            name,
            "does a thing",
            ParameterSchema::new().required("query", ParamType::String, "what to look up"),
            |_| async { Ok(Content::text("done")) }.boxed(),
        ))
    }

    fn base() -> AgentConfigBuilder {
        AgentConfig::builder("gpt-4o")
            .description("You are a movie buff")
            .instruction("Recommend films")
    }

    #[test]
    fn test_defaults() {
        let config = base().build().unwrap();
        assert_eq!(config.model_ref(), "gpt-4o");
        assert_eq!(config.flags(), AgentFlags::default());
        assert_eq!(config.limits().max_steps, 10);
        assert_eq!(config.limits().tool_timeout, Duration::from_secs(30));
        assert_eq!(config.limits().session_timeout, None);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.tool_catalog().is_empty());
    }

    #[test]
    fn test_instruction_order_kept() {
        let config = base()
            .instructions(["Mention the year", "Mention the director"])
            .build()
            .unwrap();
        assert_eq!(
            config.instructions(),
            &["Recommend films", "Mention the year", "Mention the director"]
        );
    }

    #[test]
    fn test_duplicate_tool_names_rejected() {
        let err = base()
            .tool(tool("web_search"))
            .tool(tool("web_search"))
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(msg) if msg.contains("web_search")));
    }

    #[test]
    fn test_invalid_tool_name_rejected() {
        let err = base().tool(tool("web search")).build().unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }

    #[test]
    fn test_empty_persona_rejected() {
        let err = AgentConfig::builder("gpt-4o")
            .instruction("Recommend films")
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));

        let err = AgentConfig::builder("gpt-4o")
            .description("You are a movie buff")
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));

        let err = AgentConfig::builder(" ")
            .description("You are a movie buff")
            .instruction("Recommend films")
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }

    #[test]
    fn test_limits_validated() {
        assert!(base().tool_timeout(Duration::ZERO).build().is_err());
        assert!(base()
            .session_timeout(Some(Duration::ZERO))
            .build()
            .is_err());
        assert!(base().max_steps(0).build().is_ok());
    }

    #[test]
    fn test_broken_template_rejected() {
        let err = base()
            .system_template("{% for x in %}")
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }

    #[test]
    fn test_find_tool_and_catalog() {
        let config = base()
            .tool(tool("web_search"))
            .tool(tool("read_article"))
            .build()
            .unwrap();
        let names: Vec<_> = config.tool_catalog().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["web_search", "read_article"]);
        assert!(config.find_tool("read_article").is_some());
        assert!(config.find_tool("missing").is_none());
        assert!(format!("{:?}", config).contains("read_article"));
    }
}
