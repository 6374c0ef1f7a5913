//! In-flight load tracking and self-reporting
//!
//! The counter is the single source of truth for this worker's load. The
//! push to the dispatcher is a fire-and-forget notification outside the
//! counter's critical section: the dispatcher's view is eventually
//! consistent, and a missed push is logged and dropped, never retried.

use inferoute_common::protocol::LoadReport;
use inferoute_common::METRICS;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Pushes load values to the dispatcher's `/update_load` endpoint
pub struct LoadReporter {
    client: reqwest::Client,
    dispatcher_url: String,
    worker_id: String,
    timeout: Duration,
}

impl LoadReporter {
    pub fn new(dispatcher_url: impl Into<String>, worker_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            dispatcher_url: dispatcher_url.into(),
            worker_id: worker_id.into(),
            timeout,
        }
    }

    /// Best-effort push; failures are logged and swallowed
    pub async fn report(&self, load: i64) {
        let report = LoadReport::new(&self.worker_id, load);
        let result = self
            .client
            .post(format!("{}/update_load", self.dispatcher_url))
            .timeout(self.timeout)
            .json(&report)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(load, "reported load to dispatcher");
            }
            Ok(response) => {
                METRICS.worker.report_failures.inc();
                warn!(load, status = %response.status(), "dispatcher rejected load report");
            }
            Err(e) => {
                METRICS.worker.report_failures.inc();
                warn!(load, error = %e, "failed to report load to dispatcher");
            }
        }
    }
}

/// Tracks this worker's in-flight job count
///
/// `begin` returns a guard; the count drops when the guard does, so the
/// decrement runs on success and failure paths alike.
pub struct LoadTracker {
    count: Arc<AtomicI64>,
    reporter: Arc<LoadReporter>,
}

impl LoadTracker {
    pub fn new(reporter: Arc<LoadReporter>) -> Self {
        Self {
            count: Arc::new(AtomicI64::new(0)),
            reporter,
        }
    }

    /// Current in-flight count
    pub fn current(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Increment the count for one job and notify the dispatcher
    pub fn begin(&self) -> LoadGuard {
        let load = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        METRICS.worker.in_flight.set(load);
        push(self.reporter.clone(), load);

        LoadGuard {
            count: self.count.clone(),
            reporter: self.reporter.clone(),
        }
    }
}

/// RAII handle for one in-flight job
pub struct LoadGuard {
    count: Arc<AtomicI64>,
    reporter: Arc<LoadReporter>,
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        // Saturating decrement: the count must never go negative even if
        // guards are dropped out of order with external resets.
        let previous = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| Some((v - 1).max(0)))
            .unwrap_or(0);
        let load = (previous - 1).max(0);
        METRICS.worker.in_flight.set(load);
        push(self.reporter.clone(), load);
    }
}

fn push(reporter: Arc<LoadReporter>, load: i64) {
    tokio::spawn(async move {
        reporter.report(load).await;
    });
}
