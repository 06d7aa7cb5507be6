//! Shared building blocks for the ChaosLab controller and agent.
//!
//! - [`experiment`]: the experiment / fault data model and default resolution
//! - [`traits`]: seams for the experiment log, agent transport, command runner and clock
//! - [`queue`]: the fire-and-forget work queue both processes submit tasks to
//! - [`shutdown`]: SIGINT/SIGTERM future for graceful server shutdown

pub mod error;
pub mod experiment;
pub mod queue;
pub mod shutdown;
pub mod traits;

pub use error::{CommandError, DispatchError, FaultError, QueueClosed, RegistryError};
pub use experiment::{
    AgentEndpoint, ExperimentDefinition, ExperimentRecord, FaultSpecification, FaultType,
    StatusResponse,
};
pub use queue::{Task, WorkQueue};
pub use shutdown::shutdown_signal;
pub use traits::{AgentClient, Clock, CommandOutput, CommandRunner, ExperimentLog, SystemClock};
