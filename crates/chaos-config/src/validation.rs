use crate::types::{ChaosConfig, RegistryConfig};
use crate::ConfigError;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl ChaosConfig {
    /// Validate the configuration and return a list of errors.
    ///
    /// Intended to run on the effective config, after defaults are applied.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.controller.agents.is_empty() {
            errors.push(ConfigError::NoAgentEndpoints);
        }

        for endpoint in &self.controller.agents {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                errors.push(ConfigError::InvalidEndpoint(
                    endpoint.clone(),
                    "Endpoint must start with http:// or https://".to_string(),
                ));
            }
        }

        if self.controller.request_timeout().is_zero() {
            errors.push(ConfigError::InvalidConfig(
                "controller.request_timeout must be greater than zero".to_string(),
            ));
        }

        if self.controller.max_agent_count == 0 {
            errors.push(ConfigError::InvalidConfig(
                "controller.max_agent_count must be greater than zero".to_string(),
            ));
        }

        if let RegistryConfig::Sqlite { path } = &self.controller.registry {
            if path.trim().is_empty() {
                errors.push(ConfigError::InvalidConfig(
                    "controller.registry.path is required for the sqlite registry".to_string(),
                ));
            }
        }

        let iface = &self.agent.interface;
        if iface.is_empty() || iface.chars().any(|c| c.is_whitespace() || c == '/') {
            errors.push(ConfigError::InvalidInterface(iface.clone()));
        }

        if !LOG_LEVELS.contains(&self.log.level.as_str()) {
            errors.push(ConfigError::InvalidConfig(format!(
                "Unknown log level '{}', expected one of {:?}",
                self.log.level, LOG_LEVELS
            )));
        }

        errors
    }

    /// Validate and return Ok(()) if valid, or Err with the first error.
    pub fn validate_or_err(&self) -> Result<(), ConfigError> {
        match self.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effective() -> ChaosConfig {
        let mut config = ChaosConfig::default();
        config.apply_defaults_with(None);
        config
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(effective().validate().is_empty());
    }

    #[test]
    fn test_empty_agent_list() {
        let mut config = effective();
        config.controller.agents.clear();
        assert!(config
            .validate()
            .iter()
            .any(|e| matches!(e, ConfigError::NoAgentEndpoints)));
    }

    #[test]
    fn test_endpoint_scheme_required() {
        let mut config = effective();
        config.controller.agents = vec!["agent-1:9090/inject".to_string()];
        assert!(config
            .validate()
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidEndpoint(ep, _) if ep == "agent-1:9090/inject")));
    }

    #[test]
    fn test_sqlite_registry_requires_path() {
        let mut config = effective();
        config.controller.registry = RegistryConfig::Sqlite {
            path: " ".to_string(),
        };
        assert!(config
            .validate()
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_max_agent_count() {
        let mut config = effective();
        config.controller.max_agent_count = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("max_agent_count"));
    }

    #[test]
    fn test_bad_interface_name() {
        let mut config = effective();
        config.agent.interface = "eth0 root".to_string();
        assert!(config
            .validate()
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidInterface(_))));
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = effective();
        config.log.level = "loud".to_string();
        assert!(config.validate_or_err().is_err());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = effective();
        config.controller.agents = vec!["ftp://a".to_string(), "b".to_string()];
        config.agent.interface = String::new();
        assert_eq!(config.validate().len(), 3);
    }
}
