//! Health prober
//!
//! Refreshes backend health and load before every selection. Backends
//! that are up get probed on every refresh; backends that are down are
//! left alone until the grace period has elapsed, which bounds how often
//! a dead backend is hammered.

use crate::registry::{BackendRecord, BackendRegistry};
use inferoute_common::protocol::WorkerHealth;
use inferoute_common::METRICS;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Outcome of probing one backend
#[derive(Debug)]
enum ProbeOutcome {
    Healthy { load: u32, code: u16 },
    Unhealthy { code: Option<u16> },
}

/// Probes backend `/health` endpoints and folds the results into the
/// registry. Never returns an error: every outcome becomes registry
/// state.
pub struct HealthProber {
    client: reqwest::Client,
    grace_period: Duration,
    probe_timeout: Duration,
}

impl HealthProber {
    pub fn new(grace_period: Duration, probe_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            grace_period,
            probe_timeout,
        }
    }

    /// Refresh every due record. Probes run concurrently; each result is
    /// applied to its own record independently.
    pub async fn refresh(&self, registry: &BackendRegistry) {
        let due: Vec<BackendRecord> = registry
            .snapshot()
            .await
            .into_iter()
            .filter(|r| self.is_due(r))
            .collect();

        let probes = due.into_iter().map(|record| async move {
            METRICS.dispatcher.probes_total.inc();
            let outcome = self.probe(&record.url).await;
            (record.id, outcome)
        });

        let results = futures::future::join_all(probes).await;

        for (id, outcome) in results {
            match outcome {
                ProbeOutcome::Healthy { load, code } => {
                    debug!(backend = %id, load, "backend is healthy");
                    registry.apply_health_result(&id, true, load, Some(code)).await;
                }
                ProbeOutcome::Unhealthy { code } => {
                    warn!(backend = %id, code = ?code, "backend failed health check, marking down");
                    registry.apply_health_result(&id, false, 0, code).await;
                }
            }
        }
    }

    /// A backend is due for a probe unless it is down and was checked
    /// within the grace period.
    fn is_due(&self, record: &BackendRecord) -> bool {
        if !record.is_down {
            return true;
        }

        match record.last_checked {
            Some(checked) => {
                let elapsed = SystemTime::now()
                    .duration_since(checked)
                    .unwrap_or(Duration::ZERO);
                elapsed > self.grace_period
            }
            // Down without a timestamp should not happen, but probing is
            // the safe recovery.
            None => true,
        }
    }

    async fn probe(&self, url: &str) -> ProbeOutcome {
        let response = self
            .client
            .get(format!("{url}/health"))
            .timeout(self.probe_timeout)
            .send()
            .await;

        match response {
            Ok(response) => {
                let code = response.status().as_u16();
                if !response.status().is_success() {
                    return ProbeOutcome::Unhealthy { code: Some(code) };
                }
                match response.json::<WorkerHealth>().await {
                    Ok(health) => ProbeOutcome::Healthy {
                        load: health.load.max(0) as u32,
                        code,
                    },
                    Err(_) => ProbeOutcome::Unhealthy { code: Some(code) },
                }
            }
            Err(_) => ProbeOutcome::Unhealthy { code: None },
        }
    }
}
