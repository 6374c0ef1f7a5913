//! Compute collaborator client
//!
//! Thin wrapper over the external model-serving endpoint (an
//! Ollama-compatible `/api/chat`). The payload is opaque to the rest of
//! the system; it is passed back to the caller verbatim.

use inferoute_common::config::ComputeConfig;
use inferoute_common::{InferouteError, Result};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub struct ComputeClient {
    client: reqwest::Client,
    url: String,
    model: String,
    timeout: Duration,
}

impl ComputeClient {
    pub fn new(config: &ComputeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Run one chat completion for the given question.
    ///
    /// Returns the collaborator's raw payload on success,
    /// `BackendStatus` when it answered with an error status, and `Http`
    /// on transport failure or timeout.
    pub async fn chat(&self, question: &str) -> Result<serde_json::Value> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": question}],
            "stream": false,
        });

        debug!(model = %self.model, "sending question to compute endpoint");

        let response = self
            .client
            .post(format!("{}/api/chat", self.url))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferouteError::BackendStatus {
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}
