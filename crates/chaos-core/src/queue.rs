//! Channel-based work queue for fire-and-forget tasks.
//!
//! Callers wrap each unit of background work in a [`Task`] and submit it.
//! A single worker loop receives tasks and spawns every one on its own tokio
//! task, so submitters never wait on the work itself. The queue counts
//! in-flight tasks, which lets tests and shutdown paths wait for quiescence.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::QueueClosed;

/// A named unit of background work.
pub struct Task {
    label: String,
    future: BoxFuture<'static, ()>,
    guard: Option<InFlightGuard>,
}

impl Task {
    pub fn new<F>(label: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Task {
            label: label.into(),
            future: future.boxed(),
            guard: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Decrements the in-flight count when the task finishes, panics, or is dropped unrun.
struct InFlightGuard(Arc<watch::Sender<usize>>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Handle for submitting tasks. Cheap to clone.
#[derive(Clone)]
pub struct WorkQueue {
    name: &'static str,
    tx: mpsc::UnboundedSender<Task>,
    in_flight: Arc<watch::Sender<usize>>,
    closed: Arc<AtomicBool>,
}

impl WorkQueue {
    /// Start the worker loop. Must be called from within a tokio runtime.
    pub fn start(name: &'static str) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
        let (in_flight, _) = watch::channel(0usize);

        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                debug!(queue = name, task = %task.label, "Spawning task");
                tokio::spawn(async move {
                    let Task { future, guard, .. } = task;
                    future.await;
                    drop(guard);
                });
            }
            debug!(queue = name, "Work queue closed");
        });

        WorkQueue {
            name,
            tx,
            in_flight: Arc::new(in_flight),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Refuse further submissions. Tasks already queued still run.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(queue = self.name, "Work queue no longer accepting tasks");
        }
    }

    /// True once [`close`](Self::close) was called or the worker loop is gone.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }

    /// Queue a task. Returns as soon as the task is handed to the worker loop.
    pub fn submit(&self, mut task: Task) -> Result<(), QueueClosed> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueClosed(task.label));
        }
        self.in_flight.send_modify(|n| *n += 1);
        task.guard = Some(InFlightGuard(Arc::clone(&self.in_flight)));

        self.tx
            .send(task)
            .map_err(|mpsc::error::SendError(task)| QueueClosed(task.label))
    }

    /// Tasks submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait until every submitted task has finished.
    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
