use thiserror::Error;

const ENV_PREFIX: &str = "AGENTLOOP";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: set {env_var} or add it to the settings file")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Name of the environment variable that sets a dotted settings key,
/// e.g. `provider.api_key` becomes `AGENTLOOP_PROVIDER__API_KEY`
pub fn to_env_var(field_path: &str) -> String {
    let key = field_path
        .split('.')
        .filter(|part| !part.is_empty())
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("__");
    format!("{}_{}", ENV_PREFIX, key)
}
