//! Configuration for the ChaosLab controller and agent.
//!
//! A single YAML document carries `controller`, `agent` and `log` sections.
//! `${VAR}` placeholders are interpolated from the environment before parsing,
//! and `AGENT_ENDPOINTS` overrides the configured agent list when set.

mod defaults;
mod env;
pub mod types;
mod validation;

use std::path::Path;

pub use defaults::AGENT_ENDPOINTS_ENV;
pub use env::parse_endpoint_list;
pub use types::*;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing environment variables: {0:?}")]
    MissingEnvVars(Vec<String>),

    #[error("No agent endpoints configured")]
    NoAgentEndpoints,

    #[error("Invalid agent endpoint '{0}': {1}")]
    InvalidEndpoint(String, String),

    #[error("Invalid network interface name '{0}'")]
    InvalidInterface(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChaosConfig {
    /// Parse a configuration from a YAML string.
    /// Environment variables in the format `${VAR_NAME}` will be interpolated.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let interpolated = env::interpolate_env(yaml)?;
        if interpolated.trim().is_empty() {
            return Ok(ChaosConfig::default());
        }
        let config: ChaosConfig = serde_yaml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Load a configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
