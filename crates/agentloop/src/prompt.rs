//! Builds the system message for a session from an agent's persona, instructions and tools.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agent::AgentConfig;
use crate::errors::{AgentError, AgentResult};
use crate::prompt_template::{load_prompt, SYSTEM_TEMPLATE};
use crate::tools::ToolBinding;

#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
    signature: String,
}

impl ToolInfo {
    fn from_binding(binding: &dyn ToolBinding) -> Self {
        let signature = binding
            .parameter_schema()
            .params()
            .iter()
            .map(|p| {
                let marker = if p.required { "" } else { "?" };
                format!("{}{}: {}", p.name, marker, p.kind)
            })
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            name: binding.name().to_string(),
            description: binding.description().to_string(),
            signature,
        }
    }
}

#[derive(Serialize)]
struct PromptContext<'a> {
    description: &'a str,
    instructions: &'a [String],
    tools: Vec<ToolInfo>,
    markdown: bool,
    datetime: Option<String>,
}

/// Reject a persona with nothing to say
pub fn validate_persona(description: &str, instructions: &[String]) -> AgentResult<()> {
    if description.trim().is_empty() {
        return Err(AgentError::Configuration(
            "agent description must not be empty".to_string(),
        ));
    }
    if instructions.is_empty() {
        return Err(AgentError::Configuration(
            "agent needs at least one instruction".to_string(),
        ));
    }
    if let Some(idx) = instructions.iter().position(|i| i.trim().is_empty()) {
        return Err(AgentError::Configuration(format!(
            "instruction {} is empty",
            idx + 1
        )));
    }
    Ok(())
}

/// Render the system prompt. The timestamp line only appears when the agent asks for it;
/// `current_time` pins it, otherwise the current time is used.
pub fn assemble(config: &AgentConfig, current_time: Option<DateTime<Utc>>) -> AgentResult<String> {
    validate_persona(config.description(), config.instructions())?;

    let flags = config.flags();
    let datetime = flags.add_datetime.then(|| {
        current_time
            .unwrap_or_else(Utc::now)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
    });

    let context = PromptContext {
        description: config.description(),
        instructions: config.instructions(),
        tools: config
            .tools()
            .iter()
            .map(|t| ToolInfo::from_binding(t.as_ref()))
            .collect(),
        markdown: flags.markdown,
        datetime,
    };

    let template = config.system_template().unwrap_or(SYSTEM_TEMPLATE);
    let rendered = load_prompt(template, &context)
        .map_err(|e| AgentError::Configuration(format!("system prompt template: {}", e)))?;
    Ok(rendered.trim().to_string())
}
