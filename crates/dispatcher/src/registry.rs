//! Backend registry
//!
//! Owns the set of backend records. Membership is fixed at startup; each
//! record sits behind its own lock so that updates to one backend never
//! contend with updates to another.

use inferoute_common::config::BackendEntry;
use inferoute_common::protocol::BackendStatus;
use inferoute_common::{InferouteError, Result};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::debug;

/// Registry state for a single backend worker
#[derive(Debug, Clone)]
pub struct BackendRecord {
    /// Stable unique identifier
    pub id: String,

    /// Base URL used for health probes and job forwarding
    pub url: String,

    /// Self-reported count of in-flight jobs, never negative
    pub load: u32,

    /// Down backends are excluded from selection
    pub is_down: bool,

    /// When the backend was last determined down; probing skips down
    /// backends until the grace period has elapsed past this point
    pub last_checked: Option<SystemTime>,

    /// Status code of the most recent health or forward attempt
    pub last_response_code: Option<u16>,
}

impl BackendRecord {
    fn new(entry: &BackendEntry) -> Self {
        Self {
            id: entry.id.clone(),
            url: entry.url.clone(),
            load: 0,
            is_down: false,
            last_checked: None,
            last_response_code: None,
        }
    }

    /// Wire representation for `/globalhealth`
    pub fn status(&self) -> BackendStatus {
        let last_checked = self
            .last_checked
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        BackendStatus {
            id: self.id.clone(),
            url: self.url.clone(),
            is_down: self.is_down,
            last_checked,
            load: self.load,
            last_response_code: self.last_response_code,
        }
    }
}

/// Registry of all configured backends
///
/// Records are independent: every mutating operation touches exactly one
/// record under its own write lock, so no cross-record ordering exists.
pub struct BackendRegistry {
    records: Vec<RwLock<BackendRecord>>,
    index: HashMap<String, usize>,
}

impl BackendRegistry {
    /// Build the registry from static configuration. Ids are assumed
    /// unique; config validation enforces that before this point.
    pub fn new(entries: &[BackendEntry]) -> Self {
        let records: Vec<RwLock<BackendRecord>> = entries
            .iter()
            .map(|e| RwLock::new(BackendRecord::new(e)))
            .collect();

        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();

        Self { records, index }
    }

    /// Number of configured backends
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current snapshot of all records. Values may be stale the moment
    /// they are returned; callers must treat them as best-effort.
    pub async fn snapshot(&self) -> Vec<BackendRecord> {
        let mut out = Vec::with_capacity(self.records.len());
        for record in &self.records {
            out.push(record.read().await.clone());
        }
        out
    }

    /// Fold a health probe outcome into one record
    pub async fn apply_health_result(
        &self,
        id: &str,
        healthy: bool,
        load: u32,
        response_code: Option<u16>,
    ) {
        let Some(record) = self.get(id) else {
            return;
        };

        let mut record = record.write().await;
        if healthy {
            record.is_down = false;
            record.load = load;
            record.last_response_code = response_code;
        } else {
            record.is_down = true;
            record.load = 0;
            record.last_checked = Some(SystemTime::now());
            record.last_response_code = response_code;
        }
    }

    /// Apply a worker's self-reported load. Negative wire values clamp
    /// to zero.
    pub async fn apply_load_report(&self, id: &str, load: i64) -> Result<()> {
        let record = self
            .get(id)
            .ok_or_else(|| InferouteError::UnknownBackend(id.to_string()))?;

        let mut record = record.write().await;
        record.load = load.max(0) as u32;
        debug!(backend = id, load = record.load, "updated backend load");
        Ok(())
    }

    /// Mark a backend down after a forwarding failure
    pub async fn mark_down(&self, id: &str) {
        let Some(record) = self.get(id) else {
            return;
        };

        let mut record = record.write().await;
        record.is_down = true;
        record.load = 0;
        record.last_checked = Some(SystemTime::now());
        record.last_response_code = None;
    }

    /// Record the status code of a forward attempt that got a response
    pub async fn record_response_code(&self, id: &str, code: u16) {
        let Some(record) = self.get(id) else {
            return;
        };

        record.write().await.last_response_code = Some(code);
    }

    fn get(&self, id: &str) -> Option<&RwLock<BackendRecord>> {
        self.index.get(id).map(|&i| &self.records[i])
    }
}
