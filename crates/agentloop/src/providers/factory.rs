use super::{base::ModelClient, configs::ProviderConfig, openai::OpenAiProvider};
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString};

use super::base::ProviderError;

#[derive(EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
    Ollama,
}

pub fn get_provider(config: ProviderConfig) -> Result<Arc<dyn ModelClient>, ProviderError> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Arc::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Ollama(ollama_config) => {
            Ok(Arc::new(OpenAiProvider::new(ollama_config.into())?))
        }
    }
}
