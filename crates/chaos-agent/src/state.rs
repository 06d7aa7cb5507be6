//! Shared application state for the agent's Axum server.

use std::sync::Arc;
use std::time::Instant;

use chaos_core::WorkQueue;

use crate::executor::FaultExecutor;

/// Shared state accessible to all route handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    executor: Arc<FaultExecutor>,
    queue: WorkQueue,
    started_at: Instant,
}

impl AppState {
    pub fn new(executor: Arc<FaultExecutor>, queue: WorkQueue) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                queue,
                started_at: Instant::now(),
            }),
        }
    }

    pub fn executor(&self) -> &Arc<FaultExecutor> {
        &self.inner.executor
    }

    /// Queue that fault lifecycles run on.
    pub fn queue(&self) -> &WorkQueue {
        &self.inner.queue
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
