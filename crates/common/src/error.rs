//! Common error types for Inferoute
//!
//! This module defines all error types used across the Inferoute system.
//! HTTP-facing components map these onto status codes at the boundary;
//! internally everything travels as `InferouteError`.

use std::net::AddrParseError;
use thiserror::Error;

/// Main error type for Inferoute
#[derive(Error, Debug)]
pub enum InferouteError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors (health probes, forwarding, load reports)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// No backend is currently up
    #[error("No available backends")]
    NoAvailableBackend,

    /// Load report referenced a backend id the registry does not know
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// Backend reachable but returned a non-success status
    #[error("Backend returned status {status}")]
    BackendStatus { status: u16 },

    /// Parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AddrParseError> for InferouteError {
    fn from(err: AddrParseError) -> Self {
        InferouteError::Parse(err.to_string())
    }
}

impl InferouteError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        InferouteError::Config(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        InferouteError::Connection(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        InferouteError::InvalidInput(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        InferouteError::Timeout(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        InferouteError::Internal(msg.into())
    }
}

/// Result type alias for Inferoute operations
pub type Result<T> = std::result::Result<T, InferouteError>;
