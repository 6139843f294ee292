/// Default local endpoint of an Ollama server
pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OPENAI_HOST: &str = "https://api.openai.com";

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Ollama(OllamaProviderConfig),
}

#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct OllamaProviderConfig {
    pub host: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl From<OllamaProviderConfig> for OpenAiProviderConfig {
    // Ollama serves the same chat completions API without authentication
    fn from(config: OllamaProviderConfig) -> Self {
        Self {
            host: config.host,
            api_key: None,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}
