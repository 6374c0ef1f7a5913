//! Worker HTTP server
//!
//! `/process` wraps every compute call with the load tracker so the
//! dispatcher sees this worker's in-flight count rise and fall around
//! each job, on success and failure alike.

use crate::compute::ComputeClient;
use crate::load::LoadTracker;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use inferoute_common::protocol::{ErrorBody, ProcessRequest, WorkerHealth};
use inferoute_common::{InferouteError, METRICS};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Shared state for all worker handlers
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<LoadTracker>,
    pub compute: Arc<ComputeClient>,
}

/// Build the worker router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/process", post(process))
        .route("/health", get(health))
        .with_state(state)
}

/// Execute one inference job against the compute collaborator
async fn process(State(state): State<AppState>, Json(request): Json<ProcessRequest>) -> Response {
    METRICS.worker.requests_total.inc();
    debug!("received job");

    // Held for the whole compute call; dropping it decrements the count
    // and pushes the new value, even on the error paths below.
    let _guard = state.tracker.begin();

    let timer = METRICS.worker.compute_duration.start_timer();
    let result = state.compute.chat(&request.question).await;
    timer.observe_duration();

    match result {
        Ok(payload) => {
            debug!("compute call succeeded");
            Json(payload).into_response()
        }
        Err(InferouteError::BackendStatus { status }) => {
            METRICS.worker.requests_failed.inc();
            warn!(status, "compute endpoint returned an error");
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                Json(ErrorBody::new("Compute endpoint error")),
            )
                .into_response()
        }
        Err(e) => {
            METRICS.worker.requests_failed.inc();
            error!(error = %e, "compute call failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Request to compute endpoint failed")),
            )
                .into_response()
        }
    }
}

/// Health endpoint probed by the dispatcher; reports current load
async fn health(State(state): State<AppState>) -> Json<WorkerHealth> {
    Json(WorkerHealth::ok(state.tracker.current()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::LoadReporter;
    use inferoute_common::config::ComputeConfig;
    use std::net::SocketAddr;
    use std::time::Duration;

    async fn spawn_stub_compute(delay: Duration) -> SocketAddr {
        async fn chat() -> Json<serde_json::Value> {
            Json(serde_json::json!({"message": {"content": "an answer"}}))
        }

        let app = Router::new().route(
            "/api/chat",
            post(move |_req: Json<serde_json::Value>| async move {
                tokio::time::sleep(delay).await;
                chat().await
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn spawn_worker(compute: SocketAddr) -> (SocketAddr, Arc<LoadTracker>) {
        let reporter = Arc::new(LoadReporter::new(
            "http://127.0.0.1:1",
            "backend_1",
            Duration::from_millis(100),
        ));
        let tracker = Arc::new(LoadTracker::new(reporter));
        let state = AppState {
            tracker: tracker.clone(),
            compute: Arc::new(ComputeClient::new(&ComputeConfig {
                url: format!("http://{compute}"),
                model: "llama3.2".to_string(),
                timeout_secs: 2,
            })),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        (addr, tracker)
    }

    #[tokio::test]
    async fn test_process_returns_compute_payload() {
        let compute = spawn_stub_compute(Duration::ZERO).await;
        let (worker, tracker) = spawn_worker(compute).await;

        let response = reqwest::Client::new()
            .post(format!("http://{worker}/process"))
            .json(&ProcessRequest {
                question: "q".to_string(),
            })
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let payload: serde_json::Value = response.json().await.unwrap();
        assert_eq!(payload["message"]["content"], "an answer");

        // Load returned to its pre-job value
        assert_eq!(tracker.current(), 0);
    }

    #[tokio::test]
    async fn test_health_reports_in_flight_load() {
        let compute = spawn_stub_compute(Duration::from_millis(500)).await;
        let (worker, _tracker) = spawn_worker(compute).await;
        let client = reqwest::Client::new();

        let slow_job = tokio::spawn({
            let client = client.clone();
            let url = format!("http://{worker}/process");
            async move {
                client
                    .post(url)
                    .json(&ProcessRequest {
                        question: "slow".to_string(),
                    })
                    .send()
                    .await
                    .unwrap()
            }
        });

        // Poll health while the job is in flight
        let mut peak = 0;
        for _ in 0..20 {
            let health: WorkerHealth = client
                .get(format!("http://{worker}/health"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            peak = peak.max(health.load);
            if peak > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert_eq!(peak, 1);

        slow_job.await.unwrap();

        let health: WorkerHealth = client
            .get(format!("http://{worker}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health.status, "OK");
        assert_eq!(health.load, 0);
    }

    #[tokio::test]
    async fn test_compute_transport_failure_returns_500_and_load_drops() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);

        let (worker, tracker) = spawn_worker(dead).await;

        let response = reqwest::Client::new()
            .post(format!("http://{worker}/process"))
            .json(&ProcessRequest {
                question: "q".to_string(),
            })
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 500);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body.get("error").is_some());

        assert_eq!(tracker.current(), 0);
    }
}
