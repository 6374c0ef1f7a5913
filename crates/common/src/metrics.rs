//! Metrics collection for Inferoute
//!
//! This module provides Prometheus metrics for observability.
//! All metrics are carefully designed to minimize overhead in the hot path.

use lazy_static::lazy_static;
use prometheus::{Histogram, IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics registry for Inferoute
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub dispatcher: DispatcherMetrics,
    pub worker: WorkerMetrics,
}

/// Dispatcher-specific metrics
#[derive(Debug, Clone)]
pub struct DispatcherMetrics {
    /// Jobs routed to a backend
    pub requests_routed: IntCounter,

    /// Jobs rejected because no backend was available
    pub no_backends_available: IntCounter,

    /// Jobs that failed at the forwarding step
    pub forward_failures: IntCounter,

    /// Backends currently considered up
    pub backends_up: IntGauge,

    /// Forward round-trip duration
    pub forward_duration: Histogram,

    /// Health probes issued
    pub probes_total: IntCounter,
}

/// Worker-specific metrics
#[derive(Debug, Clone)]
pub struct WorkerMetrics {
    /// Jobs received
    pub requests_total: IntCounter,

    /// Jobs that failed against the compute collaborator
    pub requests_failed: IntCounter,

    /// Jobs currently in flight
    pub in_flight: IntGauge,

    /// Compute collaborator round-trip duration
    pub compute_duration: Histogram,

    /// Load reports that could not be delivered to the dispatcher
    pub report_failures: IntCounter,
}

lazy_static! {
    /// Global metrics registry instance
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let requests_routed = IntCounter::new(
            "dispatcher_requests_routed_total",
            "Jobs routed to a backend",
        )
        .unwrap();

        let no_backends_available = IntCounter::new(
            "dispatcher_no_backends_available_total",
            "Jobs rejected because no backend was available",
        )
        .unwrap();

        let forward_failures = IntCounter::new(
            "dispatcher_forward_failures_total",
            "Jobs that failed at the forwarding step",
        )
        .unwrap();

        let backends_up =
            IntGauge::new("dispatcher_backends_up", "Backends currently considered up").unwrap();

        let forward_duration = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "dispatcher_forward_duration_seconds",
                "Forward round-trip duration in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .unwrap();

        let probes_total =
            IntCounter::new("dispatcher_probes_total", "Health probes issued").unwrap();

        let requests_total =
            IntCounter::new("worker_requests_total", "Jobs received by this worker").unwrap();

        let requests_failed = IntCounter::new(
            "worker_requests_failed_total",
            "Jobs that failed against the compute collaborator",
        )
        .unwrap();

        let in_flight = IntGauge::new("worker_in_flight", "Jobs currently in flight").unwrap();

        let compute_duration = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "worker_compute_duration_seconds",
                "Compute collaborator round-trip duration in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .unwrap();

        let report_failures = IntCounter::new(
            "worker_report_failures_total",
            "Load reports that could not be delivered to the dispatcher",
        )
        .unwrap();

        for metric in [
            Box::new(requests_routed.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(no_backends_available.clone()),
            Box::new(forward_failures.clone()),
            Box::new(backends_up.clone()),
            Box::new(forward_duration.clone()),
            Box::new(probes_total.clone()),
            Box::new(requests_total.clone()),
            Box::new(requests_failed.clone()),
            Box::new(in_flight.clone()),
            Box::new(compute_duration.clone()),
            Box::new(report_failures.clone()),
        ] {
            registry.register(metric).unwrap();
        }

        let dispatcher = DispatcherMetrics {
            requests_routed,
            no_backends_available,
            forward_failures,
            backends_up,
            forward_duration,
            probes_total,
        };

        let worker = WorkerMetrics {
            requests_total,
            requests_failed,
            in_flight,
            compute_duration,
            report_failures,
        };

        MetricsRegistry {
            registry,
            dispatcher,
            worker,
        }
    }

    /// Gather all metrics as text
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registry() {
        let metrics = MetricsRegistry::new();

        metrics.dispatcher.requests_routed.inc();
        metrics.worker.in_flight.set(2);

        let output = metrics.gather();
        assert!(output.contains("dispatcher_requests_routed_total"));
        assert!(output.contains("worker_in_flight"));
    }
}
