//! Shared application state for the controller's Axum server.

use std::sync::Arc;
use std::time::Instant;

use chaos_config::DEFAULT_MAX_AGENT_COUNT;
use chaos_core::ExperimentLog;

use crate::scheduler::Scheduler;

/// Shared state accessible to all route handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    log: Arc<dyn ExperimentLog>,
    scheduler: Scheduler,
    max_agent_count: usize,
    started_at: Instant,
}

impl AppState {
    pub fn new(log: Arc<dyn ExperimentLog>, scheduler: Scheduler) -> Self {
        Self::with_max_agent_count(log, scheduler, DEFAULT_MAX_AGENT_COUNT)
    }

    pub fn with_max_agent_count(
        log: Arc<dyn ExperimentLog>,
        scheduler: Scheduler,
        max_agent_count: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                log,
                scheduler,
                max_agent_count,
                started_at: Instant::now(),
            }),
        }
    }

    /// The experiment log.
    pub fn log(&self) -> &dyn ExperimentLog {
        self.inner.log.as_ref()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Largest fan-out accepted for a parallel experiment.
    pub fn max_agent_count(&self) -> usize {
        self.inner.max_agent_count
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
