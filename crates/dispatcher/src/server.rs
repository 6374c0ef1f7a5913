//! Dispatcher HTTP server
//!
//! Exposes the job entry point (`/process`), the load-report sink
//! (`/update_load`) and the cluster status view (`/globalhealth`).
//!
//! A job moves through select → forward → respond with no retry: a
//! forwarding failure is reported to the caller rather than silently
//! retried against another backend.

use crate::balancer::Balancer;
use crate::registry::BackendRegistry;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use inferoute_common::protocol::{BackendStatus, ErrorBody, LoadReport, MessageBody, ProcessRequest};
use inferoute_common::{InferouteError, METRICS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Shared state for all dispatcher handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BackendRegistry>,
    pub balancer: Arc<Balancer>,
    pub client: reqwest::Client,
    pub forward_timeout: Duration,
}

impl AppState {
    pub fn new(registry: Arc<BackendRegistry>, balancer: Arc<Balancer>, forward_timeout: Duration) -> Self {
        Self {
            registry,
            balancer,
            client: reqwest::Client::new(),
            forward_timeout,
        }
    }
}

/// Terminal outcomes of a dispatch, mapped onto the wire contract
#[derive(Debug)]
enum DispatchError {
    /// Every configured backend is down
    NoAvailableBackends,

    /// Backend responded with a non-success status; passed through
    BackendError { status: StatusCode },

    /// Backend unreachable or timed out while forwarding
    BackendFailed,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        match self {
            DispatchError::NoAvailableBackends => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody::new("No available backends")),
            )
                .into_response(),
            DispatchError::BackendError { status } => {
                (status, Json(ErrorBody::new("Backend error"))).into_response()
            }
            DispatchError::BackendFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Backend failed")),
            )
                .into_response(),
        }
    }
}

/// Build the dispatcher router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/process", post(process))
        .route("/globalhealth", get(global_health))
        .route("/update_load", post(update_load))
        .route("/health", get(health))
        .with_state(state)
}

/// Entry point for inbound jobs
async fn process(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<serde_json::Value>, DispatchError> {
    let job_id = Uuid::new_v4();
    debug!(%job_id, "job received, selecting backend");

    let backend = state
        .balancer
        .select(&state.registry)
        .await
        .map_err(|_| {
            METRICS.dispatcher.no_backends_available.inc();
            warn!(%job_id, "no available backends");
            DispatchError::NoAvailableBackends
        })?;

    METRICS.dispatcher.requests_routed.inc();
    info!(%job_id, backend = %backend.id, load = backend.load, "forwarding job");

    let timer = METRICS.dispatcher.forward_duration.start_timer();
    let result = state
        .client
        .post(format!("{}/process", backend.url))
        .timeout(state.forward_timeout)
        .json(&request)
        .send()
        .await;
    timer.observe_duration();

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            // Transport failure: only this path takes the backend out of
            // rotation. An error status from a reachable backend does not.
            METRICS.dispatcher.forward_failures.inc();
            state.registry.mark_down(&backend.id).await;
            error!(%job_id, backend = %backend.id, error = %e, "backend failed during processing, marking down");
            return Err(DispatchError::BackendFailed);
        }
    };

    let code = response.status().as_u16();
    state.registry.record_response_code(&backend.id, code).await;

    if !response.status().is_success() {
        METRICS.dispatcher.forward_failures.inc();
        warn!(%job_id, backend = %backend.id, code, "backend returned an error");
        return Err(DispatchError::BackendError {
            status: StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
        });
    }

    match response.json::<serde_json::Value>().await {
        Ok(payload) => {
            debug!(%job_id, backend = %backend.id, "job succeeded");
            Ok(Json(payload))
        }
        Err(e) => {
            METRICS.dispatcher.forward_failures.inc();
            state.registry.mark_down(&backend.id).await;
            error!(%job_id, backend = %backend.id, error = %e, "backend response body unreadable, marking down");
            Err(DispatchError::BackendFailed)
        }
    }
}

/// Status of every configured backend
async fn global_health(State(state): State<AppState>) -> Json<Vec<BackendStatus>> {
    let statuses = state
        .registry
        .snapshot()
        .await
        .iter()
        .map(|r| r.status())
        .collect();
    Json(statuses)
}

/// Load-report sink for workers
async fn update_load(
    State(state): State<AppState>,
    Json(report): Json<LoadReport>,
) -> Response {
    let (Some(backend_id), Some(load)) = (report.backend_id, report.load) else {
        warn!("invalid load report: missing backend_id or load");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("Missing backend_id or load")),
        )
            .into_response();
    };

    match state.registry.apply_load_report(&backend_id, load).await {
        Ok(()) => (StatusCode::OK, Json(MessageBody::new("Load updated"))).into_response(),
        Err(InferouteError::UnknownBackend(_)) => {
            warn!(backend = %backend_id, "load report from unknown backend");
            (StatusCode::BAD_REQUEST, Json(ErrorBody::new("Unknown backend"))).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to apply load report");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("Internal error")),
            )
                .into_response()
        }
    }
}

/// Liveness of the dispatcher itself
async fn health() -> &'static str {
    "OK"
}
