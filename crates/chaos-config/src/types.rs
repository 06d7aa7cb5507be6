use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Agent endpoint used when neither the config file nor `AGENT_ENDPOINTS` names one.
pub const DEFAULT_AGENT_ENDPOINT: &str = "http://localhost:9090/inject";

/// Network interface the agent shapes when none is configured.
pub const DEFAULT_INTERFACE: &str = "eth0";

/// Per-request timeout for controller → agent sends.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest `agent_count` a parallel experiment may request.
pub const DEFAULT_MAX_AGENT_COUNT: usize = 1000;

/// Root configuration shared by the controller, the agent and the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChaosConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Controller process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_controller_port")]
    pub port: u16,
    /// Ordered agent inject URLs. Dispatch cycles through them in this order.
    #[serde(default)]
    pub agents: Vec<String>,
    /// Timeout applied to each individual agent send.
    #[serde(default)]
    pub request_timeout: Option<HumanDuration>,
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Upper bound on the fan-out of one parallel experiment.
    #[serde(default = "default_max_agent_count")]
    pub max_agent_count: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_controller_port(),
            agents: Vec::new(),
            request_timeout: None,
            registry: RegistryConfig::default(),
            max_agent_count: default_max_agent_count(),
        }
    }
}

impl ControllerConfig {
    /// Effective per-send timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
            .as_ref()
            .map(HumanDuration::as_duration)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }
}

/// Where the controller keeps its experiment log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryConfig {
    /// Process-local log, lost on restart.
    #[default]
    Memory,
    /// SQLite file that survives restarts.
    Sqlite { path: String },
}

/// Agent process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_agent_port")]
    pub port: u16,
    /// Interface that network faults install their queueing rule on.
    #[serde(default = "default_interface")]
    pub interface: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_agent_port(),
            interface: default_interface(),
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default verbosity when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit newline-delimited JSON instead of human-readable lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_controller_port() -> u16 {
    8080
}

fn default_max_agent_count() -> usize {
    DEFAULT_MAX_AGENT_COUNT
}

fn default_agent_port() -> u16 {
    9090
}

fn default_interface() -> String {
    DEFAULT_INTERFACE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Human-readable duration (e.g., "500ms", "10s", "2m").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("Missing unit in duration: {}", s))?;
        let (num_str, unit) = s.split_at(split);

        let num: u64 = num_str
            .parse()
            .map_err(|_| format!("Invalid number in duration: {}", s))?;

        let duration = match unit {
            "ms" => Duration::from_millis(num),
            "s" => Duration::from_secs(num),
            "m" => Duration::from_secs(num * 60),
            "h" => Duration::from_secs(num * 3600),
            _ => return Err(format!("Unknown duration unit: {}", unit)),
        };

        Ok(HumanDuration(duration))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        if millis % 1000 != 0 {
            write!(f, "{}ms", millis)
        } else {
            write!(f, "{}s", self.0.as_secs())
        }
    }
}

impl Serialize for HumanDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        HumanDuration::from_str(&s).map_err(serde::de::Error::custom)
    }
}
