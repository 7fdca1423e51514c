//! Optional external intelligence collaborators: an address reputation feed
//! and a remote traffic model. Both are capability-gated: when unconfigured
//! they are simply absent, and any failure or timeout at lookup time is
//! treated as "no signal" rather than an error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::IntelConfig;
use crate::utils::log_backend_event;

/// Reputation report for a single address.
#[derive(Debug, Clone, Deserialize)]
pub struct Reputation {
    pub malicious: bool,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Client for an HTTP reputation feed (`GET <base>/<ip>`).
pub struct ReputationClient {
    client: reqwest::Client,
    base_url: String,
}

impl ReputationClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reputation client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Look up an address. Returns `None` on any transport or decode failure.
    pub async fn lookup(&self, ip: &str) -> Option<Reputation> {
        match self.fetch(ip).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(ip = %ip, error = %e, "reputation lookup failed, treating as no signal");
                None
            }
        }
    }

    async fn fetch(&self, ip: &str) -> anyhow::Result<Reputation> {
        let url = format!("{}/{}", self.base_url, ip);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("reputation request failed")?;
        let report = response
            .error_for_status()
            .context("reputation feed returned an error status")?
            .json::<Reputation>()
            .await
            .context("reputation response was not decodable")?;
        Ok(report)
    }
}

/// Request-derived features handed to the traffic model.
#[derive(Debug, Clone, Serialize)]
pub struct FlowFeatures {
    pub addr: String,
    pub path: String,
    pub method: String,
    pub user_agent: String,
    pub payload_bytes: usize,
}

/// Label and confidence returned by the traffic model.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

/// Interface to the optional machine-learning traffic classifier. A scorer
/// that cannot answer abstains by returning `None`.
#[async_trait]
pub trait FlowScorer: Send + Sync {
    async fn score(&self, features: &FlowFeatures) -> Option<Prediction>;
}

/// Scorer backed by a remote model service (`POST <url>` with the feature
/// vector as JSON).
pub struct RemoteScorer {
    client: reqwest::Client,
    url: String,
}

impl RemoteScorer {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build scorer client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    async fn predict(&self, features: &FlowFeatures) -> anyhow::Result<Prediction> {
        let response = self
            .client
            .post(&self.url)
            .json(features)
            .send()
            .await
            .context("scorer request failed")?;
        let prediction = response
            .error_for_status()
            .context("scorer returned an error status")?
            .json::<Prediction>()
            .await
            .context("scorer response was not decodable")?;
        Ok(prediction)
    }
}

#[async_trait]
impl FlowScorer for RemoteScorer {
    async fn score(&self, features: &FlowFeatures) -> Option<Prediction> {
        match self.predict(features).await {
            Ok(prediction) => Some(prediction),
            Err(e) => {
                tracing::warn!(error = %e, "traffic model unavailable, abstaining");
                None
            }
        }
    }
}

/// Build the configured intel collaborators. Construction failure of either
/// client maps to "collaborator absent", never to a startup error.
pub fn from_config(
    config: &IntelConfig,
) -> (Option<ReputationClient>, Option<Arc<dyn FlowScorer>>) {
    let timeout = Duration::from_secs(config.timeout_secs);

    let reputation = config.reputation_url.as_deref().and_then(|url| {
        match ReputationClient::new(url, timeout) {
            Ok(client) => {
                log_backend_event("reputation", "configured", true, Some(url));
                Some(client)
            }
            Err(e) => {
                log_backend_event("reputation", "init_failed", false, Some(&e.to_string()));
                None
            }
        }
    });

    let scorer: Option<Arc<dyn FlowScorer>> = config.scorer_url.as_deref().and_then(|url| {
        match RemoteScorer::new(url, timeout) {
            Ok(scorer) => {
                log_backend_event("scorer", "configured", true, Some(url));
                Some(Arc::new(scorer) as Arc<dyn FlowScorer>)
            }
            Err(e) => {
                log_backend_event("scorer", "init_failed", false, Some(&e.to_string()));
                None
            }
        }
    });

    (reputation, scorer)
}
