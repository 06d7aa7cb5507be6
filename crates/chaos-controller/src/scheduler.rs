//! Immediate or delayed hand-off of experiments to the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use chaos_core::{Clock, ExperimentDefinition, QueueClosed, Task, WorkQueue};

use crate::dispatcher::Dispatcher;

/// When an accepted experiment will be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    Immediate,
    Delayed(Duration),
}

/// Decide between immediate and delayed dispatch.
///
/// Only a start time strictly after `now` delays; a start time equal to
/// `now` or in the past dispatches immediately.
pub fn plan(start_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ScheduleDecision {
    match start_time {
        Some(start) if start > now => {
            ScheduleDecision::Delayed((start - now).to_std().unwrap_or_default())
        }
        _ => ScheduleDecision::Immediate,
    }
}

/// Submits a dispatch task per experiment to the work queue.
///
/// Pending timers live only in memory; a controller restart drops every
/// experiment whose start time has not arrived yet.
pub struct Scheduler {
    queue: WorkQueue,
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(queue: WorkQueue, dispatcher: Arc<Dispatcher>, clock: Arc<dyn Clock>) -> Self {
        Scheduler {
            queue,
            dispatcher,
            clock,
        }
    }

    /// Queue the experiment for dispatch and return without waiting for it.
    pub fn schedule(
        &self,
        definition: ExperimentDefinition,
    ) -> Result<ScheduleDecision, QueueClosed> {
        let decision = plan(definition.start_time, self.clock.now());
        match decision {
            ScheduleDecision::Immediate => {
                info!(experiment = %definition.name, "Starting experiment immediately");
            }
            ScheduleDecision::Delayed(delay) => {
                info!(
                    experiment = %definition.name,
                    delay_secs = delay.as_secs_f64(),
                    "Scheduling experiment (not persisted across restarts)"
                );
            }
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let label = format!("dispatch:{}", definition.name);
        self.queue.submit(Task::new(label, async move {
            if let ScheduleDecision::Delayed(delay) = decision {
                tokio::time::sleep(delay).await;
            }
            match dispatcher.dispatch(&definition).await {
                Ok(report) => info!(
                    experiment = %definition.name,
                    attempted = report.attempted,
                    accepted = report.accepted,
                    failed = report.failed,
                    "Dispatch finished"
                ),
                Err(e) => error!(experiment = %definition.name, error = %e, "Dispatch aborted"),
            }
        }))?;

        Ok(decision)
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chaos_core::{AgentClient, AgentEndpoint, DispatchError, FaultSpecification, StatusResponse};
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct TimedClient {
        sends: Mutex<Vec<tokio::time::Instant>>,
    }

    #[async_trait]
    impl AgentClient for TimedClient {
        async fn inject(
            &self,
            _endpoint: &AgentEndpoint,
            _spec: &FaultSpecification,
        ) -> Result<StatusResponse, DispatchError> {
            self.sends.lock().unwrap().push(tokio::time::Instant::now());
            Ok(StatusResponse::new("injected", "ok"))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn scheduler(client: Arc<TimedClient>) -> Scheduler {
        let dispatcher = Dispatcher::new(
            vec![AgentEndpoint::new("http://localhost:9090/inject")],
            client,
        );
        Scheduler::new(
            WorkQueue::start("scheduler-test"),
            Arc::new(dispatcher),
            Arc::new(FixedClock(now())),
        )
    }

    #[test]
    fn test_plan_without_start_time() {
        assert_eq!(plan(None, now()), ScheduleDecision::Immediate);
    }

    #[test]
    fn test_plan_past_and_exact_now_are_immediate() {
        let past = now() - chrono::Duration::seconds(5);
        assert_eq!(plan(Some(past), now()), ScheduleDecision::Immediate);
        assert_eq!(plan(Some(now()), now()), ScheduleDecision::Immediate);
    }

    #[test]
    fn test_plan_future_start_time() {
        let later = now() + chrono::Duration::milliseconds(90_500);
        assert_eq!(
            plan(Some(later), now()),
            ScheduleDecision::Delayed(Duration::from_millis(90_500))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_dispatch() {
        let client = Arc::new(TimedClient::default());
        let scheduler = scheduler(client.clone());
        let started = tokio::time::Instant::now();

        let decision = scheduler.schedule(ExperimentDefinition::default()).unwrap();
        assert_eq!(decision, ScheduleDecision::Immediate);

        scheduler.queue().wait_idle().await;
        let sends = client.sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0], started);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_dispatch_waits_for_start_time() {
        let client = Arc::new(TimedClient::default());
        let scheduler = scheduler(client.clone());
        let started = tokio::time::Instant::now();

        let def = ExperimentDefinition {
            name: "later".to_string(),
            start_time: Some(now() + chrono::Duration::seconds(120)),
            ..Default::default()
        };
        let decision = scheduler.schedule(def).unwrap();
        assert_eq!(decision, ScheduleDecision::Delayed(Duration::from_secs(120)));

        // schedule() returned without the clock moving and nothing sent yet.
        assert_eq!(tokio::time::Instant::now(), started);
        assert!(client.sends.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(119)).await;
        assert!(client.sends.lock().unwrap().is_empty());

        scheduler.queue().wait_idle().await;
        let sends = client.sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert!(sends[0] - started >= Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_experiments_do_not_block_each_other() {
        let client = Arc::new(TimedClient::default());
        let scheduler = scheduler(client.clone());

        scheduler
            .schedule(ExperimentDefinition {
                start_time: Some(now() + chrono::Duration::seconds(600)),
                ..Default::default()
            })
            .unwrap();
        scheduler.schedule(ExperimentDefinition::default()).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(client.sends.lock().unwrap().len(), 1);

        scheduler.queue().wait_idle().await;
        assert_eq!(client.sends.lock().unwrap().len(), 2);
    }
}
