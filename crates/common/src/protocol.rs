//! HTTP+JSON wire types shared by the edge, dispatcher and workers
//!
//! Field names here are the wire contract; renaming any of them breaks
//! interop with already-deployed nodes.

use serde::{Deserialize, Serialize};

/// Inference job, as posted to `/process` on both dispatcher and workers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub question: String,
}

/// Worker `/health` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHealth {
    pub status: String,
    pub load: i64,
}

impl WorkerHealth {
    pub fn ok(load: i64) -> Self {
        Self {
            status: "OK".to_string(),
            load,
        }
    }
}

/// Load report pushed by a worker to the dispatcher's `/update_load`
///
/// Both fields are optional on the wire so that a malformed report can be
/// answered with `400` instead of a framework-level rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub backend_id: Option<String>,
    pub load: Option<i64>,
}

impl LoadReport {
    pub fn new(backend_id: impl Into<String>, load: i64) -> Self {
        Self {
            backend_id: Some(backend_id.into()),
            load: Some(load),
        }
    }
}

/// One entry of the dispatcher's `/globalhealth` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    pub id: String,
    pub url: String,
    pub is_down: bool,
    /// Unix seconds of the most recent down determination, 0 if never
    pub last_checked: u64,
    pub load: u32,
    pub last_response_code: Option<u16>,
}

/// Generic error body, `{"error": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Generic message body, `{"message": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_report_tolerates_missing_fields() {
        let report: LoadReport = serde_json::from_str(r#"{"backend_id": "backend_1"}"#).unwrap();
        assert_eq!(report.backend_id.as_deref(), Some("backend_1"));
        assert!(report.load.is_none());

        let report: LoadReport = serde_json::from_str("{}").unwrap();
        assert!(report.backend_id.is_none());
    }

    #[test]
    fn test_worker_health_shape() {
        let body = serde_json::to_value(WorkerHealth::ok(3)).unwrap();
        assert_eq!(body["status"], "OK");
        assert_eq!(body["load"], 3);
    }
}
