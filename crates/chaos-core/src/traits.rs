use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{CommandError, DispatchError, RegistryError};
use crate::experiment::{
    AgentEndpoint, ExperimentDefinition, ExperimentRecord, FaultSpecification, StatusResponse,
};

/// Append-only experiment log.
///
/// Implementations serialize `record` and `list` through a single lock that
/// is never held across a network call. `list` returns an owned snapshot.
pub trait ExperimentLog: Send + Sync + 'static {
    /// Append a definition exactly as submitted and return the new record.
    fn record(&self, definition: ExperimentDefinition) -> Result<ExperimentRecord, RegistryError>;

    /// Copy of every record, in insertion order.
    fn list(&self) -> Result<Vec<ExperimentRecord>, RegistryError>;
}

/// Transport from the controller to one agent's inject endpoint.
#[async_trait]
pub trait AgentClient: Send + Sync + 'static {
    /// Send one fault specification. One attempt, no retry.
    async fn inject(
        &self,
        endpoint: &AgentEndpoint,
        spec: &FaultSpecification,
    ) -> Result<StatusResponse, DispatchError>;
}

/// Captured result of an external program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.trim_end().to_string();
        let err = self.stderr.trim_end();
        if !err.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(err);
        }
        out
    }
}

/// Runs the OS primitives (`tc`, `stress-ng`, `ps`, `kill`) a fault is made of.
#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    /// Run a program to completion and capture its output.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError>;
}

/// Wall-clock source for scheduling decisions.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
