//! Experiment and fault data model shared by the controller and the agent.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FaultError;

/// Fault duration used when the requested one is zero or negative.
pub const DEFAULT_DURATION_SECS: u64 = 30;
/// Added latency for `network-latency` when unset.
pub const DEFAULT_DELAY_MS: u64 = 100;
/// Packet loss for `network-loss` when unset.
pub const DEFAULT_LOSS_PERCENT: u8 = 10;
/// Worker count for `cpu-stress` when unset.
pub const DEFAULT_CPU_WORKERS: u32 = 2;
/// Allocation size for `mem-stress` when unset.
pub const DEFAULT_MEM_SIZE_MB: u64 = 100;

/// The closed set of faults an agent knows how to inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultType {
    NetworkLatency,
    NetworkLoss,
    CpuStress,
    MemStress,
    ProcessKill,
}

impl FaultType {
    pub const ALL: [FaultType; 5] = [
        FaultType::NetworkLatency,
        FaultType::NetworkLoss,
        FaultType::CpuStress,
        FaultType::MemStress,
        FaultType::ProcessKill,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FaultType::NetworkLatency => "network-latency",
            FaultType::NetworkLoss => "network-loss",
            FaultType::CpuStress => "cpu-stress",
            FaultType::MemStress => "mem-stress",
            FaultType::ProcessKill => "process-kill",
        }
    }

    /// Network faults hold a queueing rule on an interface for their duration.
    pub fn is_network(&self) -> bool {
        matches!(self, FaultType::NetworkLatency | FaultType::NetworkLoss)
    }
}

impl FromStr for FaultType {
    type Err = FaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FaultType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FaultError::UnknownType(s.to_string()))
    }
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client-submitted experiment.
///
/// Every field is optional on the wire; missing values deserialize to their
/// zero value and are resolved to fault defaults on the agent. `experiment_type`
/// stays a plain string so that unknown types remain structurally valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentDefinition {
    pub name: String,
    pub description: String,
    pub experiment_type: String,
    /// Free-text hint. Routing is by configured endpoint, not by target.
    pub target: String,
    /// Seconds the fault stays active.
    pub duration: i64,
    pub delay_ms: i64,
    pub loss_percent: i64,
    pub cpu_workers: i64,
    pub mem_size_mb: i64,
    pub kill_process: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    pub parallel: bool,
    pub agent_count: i64,
}

impl ExperimentDefinition {
    /// The fault specification forwarded to each target agent.
    pub fn fault_spec(&self) -> FaultSpecification {
        FaultSpecification::from(self)
    }
}

/// The part of an experiment one agent needs to run one fault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultSpecification {
    pub experiment_type: String,
    pub duration: i64,
    pub delay_ms: i64,
    pub loss_percent: i64,
    pub cpu_workers: i64,
    pub mem_size_mb: i64,
    pub kill_process: String,
}

impl From<&ExperimentDefinition> for FaultSpecification {
    fn from(def: &ExperimentDefinition) -> Self {
        FaultSpecification {
            experiment_type: def.experiment_type.clone(),
            duration: def.duration,
            delay_ms: def.delay_ms,
            loss_percent: def.loss_percent,
            cpu_workers: def.cpu_workers,
            mem_size_mb: def.mem_size_mb,
            kill_process: def.kill_process.clone(),
        }
    }
}

impl FaultSpecification {
    pub fn fault_type(&self) -> Result<FaultType, FaultError> {
        self.experiment_type.parse()
    }

    /// Active duration; never zero.
    pub fn effective_duration(&self) -> Duration {
        Duration::from_secs(positive_or(self.duration, DEFAULT_DURATION_SECS))
    }

    pub fn effective_delay_ms(&self) -> u64 {
        positive_or(self.delay_ms, DEFAULT_DELAY_MS)
    }

    /// Loss percentage in `1..=100`.
    pub fn effective_loss_percent(&self) -> u8 {
        if self.loss_percent <= 0 {
            DEFAULT_LOSS_PERCENT
        } else {
            self.loss_percent.min(100) as u8
        }
    }

    pub fn effective_cpu_workers(&self) -> u32 {
        u32::try_from(self.cpu_workers)
            .ok()
            .filter(|w| *w > 0)
            .unwrap_or(DEFAULT_CPU_WORKERS)
    }

    pub fn effective_mem_size_mb(&self) -> u64 {
        positive_or(self.mem_size_mb, DEFAULT_MEM_SIZE_MB)
    }

    /// Kill pattern, if one was given. Blank patterns count as absent.
    pub fn kill_pattern(&self) -> Option<&str> {
        let pattern = self.kill_process.trim();
        (!pattern.is_empty()).then_some(pattern)
    }
}

fn positive_or(value: i64, default: u64) -> u64 {
    if value > 0 {
        value as u64
    } else {
        default
    }
}

/// An agent inject URL, e.g. `http://10.0.0.7:9090/inject`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentEndpoint(String);

impl AgentEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        AgentEndpoint(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AgentEndpoint {
    fn from(url: String) -> Self {
        AgentEndpoint(url)
    }
}

/// Append-only log entry for an accepted experiment.
///
/// Serializes as the submitted definition plus `id` and `accepted_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    /// 1-based position in the log.
    pub id: u64,
    pub accepted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub definition: ExperimentDefinition,
}

/// `{status, message}` body returned by every controller and agent endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        StatusResponse {
            status: status.into(),
            message: message.into(),
        }
    }
}
