//! Fan-out of one experiment to its target agents.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use chaos_core::{AgentClient, AgentEndpoint, DispatchError, ExperimentDefinition, FaultSpecification};

/// Sends to agents in flight at once for a single experiment.
pub const MAX_CONCURRENT_SENDS: usize = 64;

/// Outcome of one dispatch, for logging only. Clients never see it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub accepted: usize,
    pub failed: usize,
}

/// Number of sends an experiment makes against `endpoint_count` agents.
pub fn target_count(definition: &ExperimentDefinition, endpoint_count: usize) -> usize {
    if endpoint_count == 0 {
        0
    } else if definition.parallel && definition.agent_count > 1 {
        usize::try_from(definition.agent_count).unwrap_or(usize::MAX)
    } else {
        1
    }
}

/// Choose the endpoints an experiment is sent to.
///
/// Parallel experiments with `agent_count > 1` cycle through the list
/// (`endpoints[i % len]`); everything else goes to the first endpoint only.
/// Targets are produced on demand, so the fan-out size never allocates.
pub fn select_targets<'a>(
    definition: &ExperimentDefinition,
    endpoints: &'a [AgentEndpoint],
) -> impl ExactSizeIterator<Item = &'a AgentEndpoint> + 'a {
    (0..target_count(definition, endpoints.len())).map(move |i| &endpoints[i % endpoints.len()])
}

/// Sends fault specifications to agents. At most one attempt per target.
pub struct Dispatcher {
    endpoints: Vec<AgentEndpoint>,
    client: Arc<dyn AgentClient>,
    max_concurrent: usize,
}

impl Dispatcher {
    pub fn new(endpoints: Vec<AgentEndpoint>, client: Arc<dyn AgentClient>) -> Self {
        Dispatcher {
            endpoints,
            client,
            max_concurrent: MAX_CONCURRENT_SENDS,
        }
    }

    /// Cap the number of sends in flight at once.
    pub fn with_max_concurrent(self, max_concurrent: usize) -> Self {
        Dispatcher {
            max_concurrent: max_concurrent.max(1),
            ..self
        }
    }

    pub fn endpoints(&self) -> &[AgentEndpoint] {
        &self.endpoints
    }

    /// Send the experiment to every selected target and wait for all sends.
    ///
    /// A failed send is logged and counted; it never aborts the other sends.
    pub async fn dispatch(
        &self,
        definition: &ExperimentDefinition,
    ) -> Result<DispatchReport, DispatchError> {
        if self.endpoints.is_empty() {
            error!(experiment = %definition.name, "No agent endpoints configured, aborting dispatch");
            return Err(DispatchError::NoEndpoints);
        }

        let targets = select_targets(definition, &self.endpoints);
        let spec = definition.fault_spec();
        info!(
            experiment = %definition.name,
            fault = %spec.experiment_type,
            targets = targets.len(),
            "Dispatching experiment to agent(s)"
        );

        let spec = &spec;
        let report = stream::iter(targets)
            .map(|endpoint| self.send(endpoint, spec))
            .buffer_unordered(self.max_concurrent)
            .boxed()
            .fold(DispatchReport::default(), |mut report, accepted| async move {
                report.attempted += 1;
                if accepted {
                    report.accepted += 1;
                } else {
                    report.failed += 1;
                }
                report
            })
            .await;
        Ok(report)
    }

    async fn send(&self, endpoint: &AgentEndpoint, spec: &FaultSpecification) -> bool {
        match self.client.inject(endpoint, spec).await {
            Ok(resp) => {
                info!(%endpoint, status = %resp.status, "Agent acknowledged fault");
                true
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "Failed to send fault to agent");
                false
            }
        }
    }
}
