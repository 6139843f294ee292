use agentloop::agent::{DEFAULT_MAX_STEPS, DEFAULT_TOOL_TIMEOUT};
use agentloop::providers::configs::{
    OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig, OLLAMA_HOST, OPENAI_HOST,
};
use agentloop::providers::factory::ProviderType;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{to_env_var, ConfigError};

/// Settings file picked up from the working directory when `--config` is not given
pub const DEFAULT_SETTINGS_FILE: &str = "agentloop.toml";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::Ollama { .. } => ProviderType::Ollama,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderSettings::OpenAi { model, .. } | ProviderSettings::Ollama { model, .. } => model,
        }
    }

    /// Convert to the library's provider config. OpenAI needs a key; Ollama does not.
    pub fn into_config(self) -> Result<ProviderConfig, ConfigError> {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                temperature,
                max_tokens,
                ..
            } => {
                let api_key = api_key
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingEnvVar {
                        env_var: to_env_var("provider.api_key"),
                    })?;
                Ok(ProviderConfig::OpenAi(OpenAiProviderConfig {
                    host,
                    api_key: Some(api_key),
                    temperature,
                    max_tokens,
                }))
            }
            ProviderSettings::Ollama {
                host,
                temperature,
                max_tokens,
                ..
            } => Ok(ProviderConfig::Ollama(OllamaProviderConfig {
                host,
                temperature,
                max_tokens,
            })),
        }
    }
}

/// Session limits and presentation overrides applied on top of a persona
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentSettings {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub session_timeout_secs: Option<u64>,
    /// Overrides the persona's own choice when set
    #[serde(default)]
    pub show_tool_calls: Option<bool>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            tool_timeout_secs: default_tool_timeout_secs(),
            session_timeout_secs: None,
            show_tool_calls: None,
        }
    }
}

impl AgentSettings {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn session_timeout(&self) -> Option<Duration> {
        self.session_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

impl Settings {
    /// Load defaults, then the settings file, then `AGENTLOOP_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::new(DEFAULT_SETTINGS_FILE, FileFormat::Toml).required(false),
        };

        let config = Config::builder()
            .set_default("provider.type", ProviderType::OpenAi.to_string())?
            .add_source(file)
            .add_source(
                Environment::with_prefix("AGENTLOOP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let Some(field) = missing_field(&err.to_string()) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

/// Dotted path of the field named in a "missing field `x` for key `y`" message
fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let (field, rest) = rest.split_once('`')?;
    let key = rest
        .split_once("for key `")
        .and_then(|(_, key)| key.split_once('`'))
        .map(|(key, _)| key)
        .filter(|key| !key.is_empty());
    Some(match key {
        Some(key) => format!("{}.{}", key, field),
        None => field.to_string(),
    })
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_ollama_host() -> String {
    OLLAMA_HOST.to_string()
}

fn default_ollama_model() -> String {
    "llama3.1".to_string()
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

fn default_tool_timeout_secs() -> u64 {
    DEFAULT_TOOL_TIMEOUT.as_secs()
}
