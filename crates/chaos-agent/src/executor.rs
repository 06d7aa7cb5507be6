//! Fault execution against the host.
//!
//! A [`FaultSpecification`] is resolved into a [`Fault`] (defaults applied,
//! type checked) and then run to completion by [`FaultExecutor::execute`].
//! Every fault reaches exactly one terminal [`FaultOutcome`]; there is no
//! cancellation once a fault has started.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{error, info, warn};

use chaos_core::{CommandRunner, FaultError, FaultSpecification, FaultType};

use crate::lease::InterfaceLeases;

/// A fault with every parameter resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    NetworkLatency {
        interface: String,
        delay_ms: u64,
        duration: Duration,
    },
    NetworkLoss {
        interface: String,
        loss_percent: u8,
        duration: Duration,
    },
    CpuStress {
        workers: u32,
        duration: Duration,
    },
    MemStress {
        size_mb: u64,
        duration: Duration,
    },
    ProcessKill {
        pattern: String,
    },
}

impl Fault {
    /// Resolve a wire specification. Network faults target `interface`.
    pub fn from_spec(spec: &FaultSpecification, interface: &str) -> Result<Fault, FaultError> {
        let duration = spec.effective_duration();
        let fault = match spec.fault_type()? {
            FaultType::NetworkLatency => Fault::NetworkLatency {
                interface: interface.to_string(),
                delay_ms: spec.effective_delay_ms(),
                duration,
            },
            FaultType::NetworkLoss => Fault::NetworkLoss {
                interface: interface.to_string(),
                loss_percent: spec.effective_loss_percent(),
                duration,
            },
            FaultType::CpuStress => Fault::CpuStress {
                workers: spec.effective_cpu_workers(),
                duration,
            },
            FaultType::MemStress => Fault::MemStress {
                size_mb: spec.effective_mem_size_mb(),
                duration,
            },
            FaultType::ProcessKill => Fault::ProcessKill {
                pattern: spec
                    .kill_pattern()
                    .ok_or(FaultError::MissingKillPattern)?
                    .to_string(),
            },
        };
        Ok(fault)
    }

    pub fn fault_type(&self) -> FaultType {
        match self {
            Fault::NetworkLatency { .. } => FaultType::NetworkLatency,
            Fault::NetworkLoss { .. } => FaultType::NetworkLoss,
            Fault::CpuStress { .. } => FaultType::CpuStress,
            Fault::MemStress { .. } => FaultType::MemStress,
            Fault::ProcessKill { .. } => FaultType::ProcessKill,
        }
    }

    /// The program and arguments that start this fault.
    ///
    /// `None` for process-kill, whose command depends on the process table.
    pub fn start_command(&self) -> Option<(&'static str, Vec<String>)> {
        let cmd = match self {
            Fault::NetworkLatency {
                interface,
                delay_ms,
                ..
            } => ("tc", netem_args(interface, "delay", format!("{}ms", delay_ms))),
            Fault::NetworkLoss {
                interface,
                loss_percent,
                ..
            } => ("tc", netem_args(interface, "loss", format!("{}%", loss_percent))),
            Fault::CpuStress { workers, duration } => (
                "stress-ng",
                vec![
                    "--cpu".to_string(),
                    workers.to_string(),
                    "--timeout".to_string(),
                    format!("{}s", duration.as_secs()),
                ],
            ),
            Fault::MemStress { size_mb, duration } => (
                "stress-ng",
                vec![
                    "--vm".to_string(),
                    "1".to_string(),
                    "--vm-bytes".to_string(),
                    format!("{}m", size_mb),
                    "--timeout".to_string(),
                    format!("{}s", duration.as_secs()),
                ],
            ),
            Fault::ProcessKill { .. } => return None,
        };
        Some(cmd)
    }
}

fn netem_args(interface: &str, kind: &str, value: String) -> Vec<String> {
    ["qdisc", "add", "dev", interface, "root", "netem", kind]
        .into_iter()
        .map(str::to_string)
        .chain(std::iter::once(value))
        .collect()
}

fn qdisc_del_args(interface: &str) -> Vec<String> {
    ["qdisc", "del", "dev", interface, "root"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Terminal state of one fault instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultOutcome {
    /// A network fault ran for its duration and its rule removal was attempted.
    CleanedUp,
    /// A stress process exited on its own timeout (or failed; see logs).
    SelfExpired,
    /// A matching process was sent SIGKILL.
    Killed { pid: u32 },
    /// No live process matched the kill pattern.
    NoMatch,
    /// The fault was never started.
    Skipped(FaultError),
    /// The fault's primary command could not be run.
    Failed(String),
}

/// One row of `ps -eo pid,cmd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub cmd: String,
}

const PS_ARGS: [&str; 2] = ["-eo", "pid,cmd"];

/// Parse `ps -eo pid,cmd` output. The header and malformed rows are skipped.
pub fn parse_process_list(output: &str) -> Vec<ProcessEntry> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let (pid, cmd) = line.split_once(char::is_whitespace)?;
            Some(ProcessEntry {
                pid: pid.parse().ok()?,
                cmd: cmd.trim().to_string(),
            })
        })
        .collect()
}

/// Processes a kill may target: command contains `pattern`, and the entry is
/// neither `own_pid` nor the process listing itself.
pub fn kill_candidates(entries: &[ProcessEntry], pattern: &str, own_pid: u32) -> Vec<ProcessEntry> {
    let listing = format!("ps {}", PS_ARGS.join(" "));
    entries
        .iter()
        .filter(|e| e.pid != own_pid && e.cmd != listing && e.cmd.contains(pattern))
        .cloned()
        .collect()
}

/// Runs faults through a [`CommandRunner`].
pub struct FaultExecutor {
    runner: Arc<dyn CommandRunner>,
    leases: InterfaceLeases,
    interface: String,
    own_pid: u32,
    rng: Mutex<ChaCha8Rng>,
}

impl FaultExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>, interface: impl Into<String>) -> Self {
        FaultExecutor {
            runner,
            leases: InterfaceLeases::new(),
            interface: interface.into(),
            own_pid: std::process::id(),
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Use a deterministic RNG for kill-target selection.
    pub fn with_seed(self, seed: u64) -> Self {
        FaultExecutor {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Treat `pid` as this agent's own process.
    pub fn with_own_pid(self, pid: u32) -> Self {
        FaultExecutor {
            own_pid: pid,
            ..self
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn leases(&self) -> &InterfaceLeases {
        &self.leases
    }

    /// Resolve and run one fault to its terminal outcome.
    pub async fn execute(&self, spec: &FaultSpecification) -> FaultOutcome {
        let fault = match Fault::from_spec(spec, &self.interface) {
            Ok(fault) => fault,
            Err(e) => {
                warn!(fault = %spec.experiment_type, error = %e, "Dropping fault");
                return FaultOutcome::Skipped(e);
            }
        };
        let fault_type = fault.fault_type();
        let outcome = self.run(fault).await;
        info!(fault = %fault_type, ?outcome, "Fault finished");
        outcome
    }

    /// Run an already resolved fault.
    pub async fn run(&self, fault: Fault) -> FaultOutcome {
        match &fault {
            Fault::NetworkLatency {
                interface,
                duration,
                ..
            }
            | Fault::NetworkLoss {
                interface,
                duration,
                ..
            } => self.run_network(&fault, interface, *duration).await,
            Fault::CpuStress { .. } | Fault::MemStress { .. } => self.run_stress(&fault).await,
            Fault::ProcessKill { pattern } => self.run_kill(pattern).await,
        }
    }

    async fn run_network(&self, fault: &Fault, interface: &str, duration: Duration) -> FaultOutcome {
        let _lease = match self.leases.try_acquire(interface) {
            Ok(lease) => lease,
            Err(e) => {
                warn!(fault = %fault.fault_type(), error = %e, "Refusing network fault");
                return FaultOutcome::Skipped(e);
            }
        };

        if let Some((program, args)) = fault.start_command() {
            info!(fault = %fault.fault_type(), interface, ?args, "Starting network fault");
            self.run_logged(program, &args, "Failed to start network fault")
                .await;
        }

        tokio::time::sleep(duration).await;

        // Attempted even when the start failed.
        info!(interface, "Removing network fault");
        self.run_logged("tc", &qdisc_del_args(interface), "Failed to remove network fault")
            .await;
        FaultOutcome::CleanedUp
    }

    async fn run_stress(&self, fault: &Fault) -> FaultOutcome {
        let Some((program, args)) = fault.start_command() else {
            return FaultOutcome::Failed("no command for stress fault".to_string());
        };
        info!(fault = %fault.fault_type(), ?args, "Starting stress process");
        match self.runner.run(program, &args).await {
            Ok(out) => {
                if out.success() {
                    info!(fault = %fault.fault_type(), output = %out.combined(), "Stress process completed");
                } else {
                    error!(
                        fault = %fault.fault_type(),
                        exit_code = ?out.exit_code,
                        output = %out.combined(),
                        "Stress process failed"
                    );
                }
                FaultOutcome::SelfExpired
            }
            Err(e) => {
                error!(fault = %fault.fault_type(), error = %e, "Could not launch stress process");
                FaultOutcome::Failed(e.to_string())
            }
        }
    }

    async fn run_kill(&self, pattern: &str) -> FaultOutcome {
        let ps_args: Vec<String> = PS_ARGS.iter().map(|s| s.to_string()).collect();
        let listing = match self.runner.run("ps", &ps_args).await {
            Ok(out) if out.success() => out.stdout,
            Ok(out) => {
                error!(exit_code = ?out.exit_code, output = %out.combined(), "Listing processes failed");
                return FaultOutcome::Failed("process listing failed".to_string());
            }
            Err(e) => {
                error!(error = %e, "Listing processes failed");
                return FaultOutcome::Failed(e.to_string());
            }
        };

        let candidates = kill_candidates(&parse_process_list(&listing), pattern, self.own_pid);
        let target = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            candidates.choose(&mut *rng).cloned()
        };
        let Some(target) = target else {
            info!(pattern, "No process matched kill pattern");
            return FaultOutcome::NoMatch;
        };

        info!(pid = target.pid, cmd = %target.cmd, candidates = candidates.len(), "Killing process");
        let kill_args = vec!["-9".to_string(), target.pid.to_string()];
        match self.runner.run("kill", &kill_args).await {
            Ok(out) if out.success() => FaultOutcome::Killed { pid: target.pid },
            Ok(out) => {
                error!(pid = target.pid, output = %out.combined(), "Kill failed");
                FaultOutcome::Failed(format!("kill -9 {} failed", target.pid))
            }
            Err(e) => {
                error!(pid = target.pid, error = %e, "Kill failed");
                FaultOutcome::Failed(e.to_string())
            }
        }
    }

    /// Run a command whose failure is logged and otherwise ignored.
    async fn run_logged(&self, program: &str, args: &[String], failure: &str) {
        match self.runner.run(program, args).await {
            Ok(out) if out.success() => {}
            Ok(out) => {
                error!(program, exit_code = ?out.exit_code, output = %out.combined(), "{}", failure);
            }
            Err(e) => error!(program, error = %e, "{}", failure),
        }
    }
}
