//! Least-loaded backend selection
//!
//! Selection refreshes health first, then picks the up backend with the
//! lowest self-reported load. The candidate list is shuffled before the
//! minimum scan so that ties are broken differently from call to call
//! instead of always favoring the first-configured backend.

use crate::prober::HealthProber;
use crate::registry::{BackendRecord, BackendRegistry};
use inferoute_common::{InferouteError, Result, METRICS};
use rand::seq::SliceRandom;
use tracing::debug;

pub struct Balancer {
    prober: HealthProber,
}

impl Balancer {
    pub fn new(prober: HealthProber) -> Self {
        Self { prober }
    }

    /// Select a backend for one job, or fail with `NoAvailableBackend`
    /// if every backend is down.
    pub async fn select(&self, registry: &BackendRegistry) -> Result<BackendRecord> {
        self.prober.refresh(registry).await;

        let mut records = registry.snapshot().await;
        let up = records.iter().filter(|r| !r.is_down).count();
        METRICS.dispatcher.backends_up.set(up as i64);

        records.shuffle(&mut rand::rng());

        match pick_least_loaded(records) {
            Some(record) => {
                debug!(backend = %record.id, load = record.load, "selected backend");
                Ok(record)
            }
            None => Err(InferouteError::NoAvailableBackend),
        }
    }
}

/// First up record with minimal load wins; the caller shuffles first, so
/// "first" is a different backend on every tie.
fn pick_least_loaded(records: Vec<BackendRecord>) -> Option<BackendRecord> {
    records
        .into_iter()
        .filter(|r| !r.is_down)
        .fold(None, |best: Option<BackendRecord>, r| match best {
            Some(b) if b.load <= r.load => Some(b),
            _ => Some(r),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(id: &str, load: u32, is_down: bool) -> BackendRecord {
        BackendRecord {
            id: id.to_string(),
            url: format!("http://localhost/{id}"),
            load,
            is_down,
            last_checked: None,
            last_response_code: None,
        }
    }

    #[test]
    fn test_unique_minimum_always_wins() {
        for _ in 0..100 {
            let mut records = vec![record("a", 3, false), record("b", 1, false)];
            records.shuffle(&mut rand::rng());

            let picked = pick_least_loaded(records).unwrap();
            assert_eq!(picked.id, "b");
        }
    }

    #[test]
    fn test_down_backends_are_never_selected() {
        let records = vec![
            record("a", 0, true),
            record("b", 9, false),
            record("c", 0, true),
        ];

        let picked = pick_least_loaded(records).unwrap();
        assert_eq!(picked.id, "b");
    }

    #[test]
    fn test_all_down_yields_none() {
        let records = vec![record("a", 0, true), record("b", 0, true)];
        assert!(pick_least_loaded(records).is_none());
    }

    #[test]
    fn test_some_backend_selected_when_any_is_up() {
        let records = vec![record("a", 5, true), record("b", 5, false)];
        assert!(pick_least_loaded(records).is_some());
    }

    #[test]
    fn test_ties_spread_across_backends_over_many_calls() {
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let mut records = vec![record("a", 2, false), record("b", 2, false)];
            records.shuffle(&mut rand::rng());
            seen.insert(pick_least_loaded(records).unwrap().id);
        }

        // 200 shuffled draws missing one of two tied backends is ~2^-199
        assert!(seen.contains("a"));
        assert!(seen.contains("b"));
    }

    #[test]
    fn test_selection_returns_minimum_load() {
        for _ in 0..50 {
            let mut records = vec![
                record("a", 4, false),
                record("b", 2, false),
                record("c", 7, true),
                record("d", 2, false),
            ];
            records.shuffle(&mut rand::rng());

            let picked = pick_least_loaded(records).unwrap();
            assert_eq!(picked.load, 2);
        }
    }
}
