//! Configuration structures for Inferoute
//!
//! This module defines all configuration types used across the dispatcher,
//! workers and the edge. Configurations are loaded from YAML files; the
//! file path comes from the `INFEROUTE_CONFIG` environment variable with a
//! per-binary default.

use crate::error::{InferouteError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for Inferoute components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Mode: "dispatcher", "worker" or "edge"
    pub mode: String,

    /// Server binding address
    pub bind_address: String,

    /// Server port
    pub port: u16,

    /// Dispatcher-specific configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatcher: Option<DispatcherConfig>,

    /// Worker-specific configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerConfig>,

    /// Edge-specific configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeConfig>,
}

/// A single statically configured backend worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEntry {
    /// Unique backend identifier, echoed back in load reports
    pub id: String,

    /// Base URL of the worker process
    pub url: String,
}

/// Dispatcher-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Static backend set; membership is fixed for the process lifetime
    pub backends: Vec<BackendEntry>,

    /// How long a down backend is left unprobed before the next check
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    /// Timeout for a single health probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Timeout for forwarding a job to a worker
    #[serde(default = "default_forward_timeout")]
    pub forward_timeout_secs: u64,
}

/// Worker-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Unique worker identifier, must match a dispatcher backend entry
    pub worker_id: String,

    /// Base URL of the dispatcher (for load reports)
    pub dispatcher_url: String,

    /// Timeout for pushing a load report to the dispatcher
    #[serde(default = "default_report_timeout")]
    pub report_timeout_secs: u64,

    /// Compute collaborator settings
    pub compute: ComputeConfig,
}

/// Settings for the external model-serving endpoint a worker calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Base URL of the model-serving endpoint
    pub url: String,

    /// Model identifier passed on every chat request
    pub model: String,

    /// Timeout for a single compute call
    #[serde(default = "default_compute_timeout")]
    pub timeout_secs: u64,
}

/// Edge-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Base URL of the dispatcher
    pub dispatcher_url: String,

    /// Timeout for calls into the dispatcher
    #[serde(default = "default_forward_timeout")]
    pub request_timeout_secs: u64,
}

fn default_grace_period() -> u64 {
    300
}

fn default_probe_timeout() -> u64 {
    2
}

fn default_forward_timeout() -> u64 {
    30
}

fn default_report_timeout() -> u64 {
    2
}

fn default_compute_timeout() -> u64 {
    30
}

impl NodeConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            InferouteError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: NodeConfig = serde_yaml::from_str(&content).map_err(|e| {
            InferouteError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.mode.as_str() {
            "dispatcher" => {
                let dispatcher = self
                    .dispatcher
                    .as_ref()
                    .ok_or_else(|| InferouteError::config("Dispatcher config required for dispatcher mode"))?;
                if dispatcher.backends.is_empty() {
                    return Err(InferouteError::config("At least one backend must be configured"));
                }
                let mut ids: Vec<&str> = dispatcher.backends.iter().map(|b| b.id.as_str()).collect();
                ids.sort_unstable();
                ids.dedup();
                if ids.len() != dispatcher.backends.len() {
                    return Err(InferouteError::config("Backend ids must be unique"));
                }
            }
            "worker" => {
                if self.worker.is_none() {
                    return Err(InferouteError::config("Worker config required for worker mode"));
                }
            }
            "edge" => {
                if self.edge.is_none() {
                    return Err(InferouteError::config("Edge config required for edge mode"));
                }
            }
            _ => {
                return Err(InferouteError::config(format!("Invalid mode: {}", self.mode)));
            }
        }
        Ok(())
    }

    /// Socket address string to bind the server on
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Get grace period as Duration
    pub fn grace_period(&self) -> Result<Duration> {
        let dispatcher = self
            .dispatcher
            .as_ref()
            .ok_or_else(|| InferouteError::config("Dispatcher config not found"))?;

        Ok(Duration::from_secs(dispatcher.grace_period_secs))
    }

    /// Get forward timeout as Duration
    pub fn forward_timeout(&self) -> Result<Duration> {
        let dispatcher = self
            .dispatcher
            .as_ref()
            .ok_or_else(|| InferouteError::config("Dispatcher config not found"))?;

        Ok(Duration::from_secs(dispatcher.forward_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher_config(backends: Vec<BackendEntry>) -> NodeConfig {
        NodeConfig {
            mode: "dispatcher".to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 5001,
            dispatcher: Some(DispatcherConfig {
                backends,
                grace_period_secs: 300,
                probe_timeout_secs: 2,
                forward_timeout_secs: 30,
            }),
            worker: None,
            edge: None,
        }
    }

    #[test]
    fn test_config_validation() {
        let config = dispatcher_config(vec![
            BackendEntry {
                id: "backend_1".to_string(),
                url: "http://localhost:5002".to_string(),
            },
            BackendEntry {
                id: "backend_2".to_string(),
                url: "http://localhost:5003".to_string(),
            },
        ]);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_missing_section() {
        let config = NodeConfig {
            mode: "worker".to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 5002,
            dispatcher: None,
            worker: None,
            edge: None,
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_duplicate_ids() {
        let config = dispatcher_config(vec![
            BackendEntry {
                id: "backend_1".to_string(),
                url: "http://localhost:5002".to_string(),
            },
            BackendEntry {
                id: "backend_1".to_string(),
                url: "http://localhost:5003".to_string(),
            },
        ]);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_empty_backends() {
        let config = dispatcher_config(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml_defaults() {
        let yaml = r#"
mode: dispatcher
bind_address: 0.0.0.0
port: 5001
dispatcher:
  backends:
    - id: backend_1
      url: http://localhost:5002
"#;
        let config: NodeConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let dispatcher = config.dispatcher.as_ref().unwrap();
        assert_eq!(dispatcher.grace_period_secs, 300);
        assert_eq!(dispatcher.probe_timeout_secs, 2);
        assert_eq!(dispatcher.forward_timeout_secs, 30);
    }
}
