use crate::env::parse_endpoint_list;
use crate::types::{ChaosConfig, HumanDuration, DEFAULT_AGENT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT};

/// Environment variable that overrides the configured agent list.
pub const AGENT_ENDPOINTS_ENV: &str = "AGENT_ENDPOINTS";

impl ChaosConfig {
    /// Apply default inference rules, reading `AGENT_ENDPOINTS` from the process environment.
    pub fn apply_defaults(&mut self) {
        let from_env = std::env::var(AGENT_ENDPOINTS_ENV).ok();
        self.apply_defaults_with(from_env.as_deref());
    }

    /// Apply default inference rules with an explicit `AGENT_ENDPOINTS` value.
    ///
    /// 1. A non-empty endpoint override replaces the configured agent list.
    /// 2. An empty agent list falls back to the single local agent.
    /// 3. A missing request timeout is filled in.
    pub fn apply_defaults_with(&mut self, endpoints_override: Option<&str>) {
        if let Some(raw) = endpoints_override {
            let endpoints = parse_endpoint_list(raw);
            if !endpoints.is_empty() {
                self.controller.agents = endpoints;
            }
        }

        if self.controller.agents.is_empty() {
            self.controller.agents = vec![DEFAULT_AGENT_ENDPOINT.to_string()];
        }

        if self.controller.request_timeout.is_none() {
            self.controller.request_timeout = Some(HumanDuration(DEFAULT_REQUEST_TIMEOUT));
        }

        self.log.level = self.log.level.trim().to_lowercase();
    }

    /// Returns a new config with all defaults applied.
    pub fn effective(&self) -> ChaosConfig {
        let mut config = self.clone();
        config.apply_defaults();
        config
    }
}
