//! Client for the downstream collector that receives verdict batches.

use reqwest::Client as ReqwestClient;
use std::time::Duration;

use crate::config::RelayConfig;
use crate::core::Verdict;
use crate::utils::{EngineError, EngineResult};

/// Forwards verdict batches to the downstream collector over HTTP.
///
/// Any 2xx response is success. Failures carry the status and body text so
/// the delivery worker can log them; the worker never retries a batch.
pub struct RelayClient {
    client: ReqwestClient,
    url: String,
}

impl RelayClient {
    /// Creates a new relay client with a bounded per-request timeout.
    pub fn new(config: &RelayConfig) -> EngineResult<Self> {
        Ok(Self {
            client: ReqwestClient::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST one batch as a JSON array of verdict records.
    pub async fn forward(&self, batch: &[Verdict]) -> EngineResult<()> {
        let response = self.client.post(&self.url).json(batch).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Relay(format!(
                "collector returned {}: {}",
                status, body
            )));
        }

        tracing::debug!(count = %batch.len(), status = %status, "batch forwarded to collector");
        Ok(())
    }
}
