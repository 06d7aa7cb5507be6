//! Route definitions for the agent API.

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Fault specifications are small; 64 KB is plenty.
const DEFAULT_BODY_LIMIT: usize = 64 * 1024;
const DEFAULT_CONCURRENCY_LIMIT: usize = 128;

/// Build the Axum router with all agent routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/inject", post(handlers::inject))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(DEFAULT_REQUEST_TIMEOUT))
        .layer(RequestBodyLimitLayer::new(DEFAULT_BODY_LIMIT))
        .layer(ConcurrencyLimitLayer::new(DEFAULT_CONCURRENCY_LIMIT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use chaos_core::{CommandError, CommandOutput, CommandRunner, WorkQueue};

    use crate::executor::FaultExecutor;

    #[derive(Default)]
    struct RecordingRunner {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
            self.lines
                .lock()
                .unwrap()
                .push(format!("{} {}", program, args.join(" ")));
            Ok(CommandOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        }
    }

    fn setup() -> (Router, Arc<RecordingRunner>, WorkQueue) {
        let runner = Arc::new(RecordingRunner::default());
        let executor = FaultExecutor::new(runner.clone(), "eth0");
        let queue = WorkQueue::start("agent-test");
        let state = AppState::new(Arc::new(executor), queue.clone());
        (build_router(state), runner, queue)
    }

    fn post_inject(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/inject")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_interface() {
        let (app, _, _) = setup();
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["interface"], "eth0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_inject_acknowledges_before_fault_completes() {
        let (app, runner, queue) = setup();
        let resp = app
            .oneshot(post_inject(
                r#"{"experiment_type":"network-latency","delay_ms":200,"duration":3}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["status"], "injected");
        assert_eq!(json["message"], "Fault injection in progress");
        assert_eq!(queue.in_flight(), 1);

        queue.wait_idle().await;
        assert_eq!(
            *runner.lines.lock().unwrap(),
            vec![
                "tc qdisc add dev eth0 root netem delay 200ms".to_string(),
                "tc qdisc del dev eth0 root".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_inject_ignores_unknown_fields() {
        let (app, runner, queue) = setup();
        let resp = app
            .oneshot(post_inject(
                r#"{"experiment_type":"cpu-stress","cpu_workers":3,"duration":1,"name":"extra"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        queue.wait_idle().await;
        assert_eq!(
            *runner.lines.lock().unwrap(),
            vec!["stress-ng --cpu 3 --timeout 1s".to_string()]
        );
    }

    #[tokio::test]
    async fn test_inject_invalid_json() {
        let (app, runner, queue) = setup();
        let resp = app.oneshot(post_inject("{{{")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "Invalid JSON");
        assert_eq!(queue.in_flight(), 0);
        assert!(runner.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inject_wrong_method() {
        let (app, _, _) = setup();
        let resp = app
            .oneshot(Request::builder().uri("/inject").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_type_is_acknowledged_then_dropped() {
        let (app, runner, queue) = setup();
        let resp = app
            .oneshot(post_inject(r#"{"experiment_type":"disk-fill"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "injected");

        queue.wait_idle().await;
        assert!(runner.lines.lock().unwrap().is_empty());
    }
}
