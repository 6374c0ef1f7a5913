//! Inferoute common library
//!
//! This crate contains shared code used across Inferoute components.

pub mod config;
pub mod error;
pub mod metrics;
pub mod protocol;

// Re-export commonly used types
pub use config::NodeConfig;
pub use error::{InferouteError, Result};
pub use metrics::{MetricsRegistry, METRICS};
