//! Decision handler glue: runs the classifier, applies BLOCK verdicts to the
//! blocklist, enqueues every verdict, and returns it synchronously. The
//! caller always observes the verdict immediately; persistence and downstream
//! delivery stay asynchronous.

use std::sync::Arc;
use std::time::Duration;

use crate::core::{Blocklist, Classifier, DecisionRequest, Status, Verdict};
use crate::queue::LogQueue;

/// Front-facing decision path, one call per inbound request.
pub struct DecisionEngine {
    classifier: Classifier,
    blocklist: Arc<Blocklist>,
    queue: Arc<LogQueue>,
    block_duration: Duration,
}

impl DecisionEngine {
    pub fn new(
        classifier: Classifier,
        blocklist: Arc<Blocklist>,
        queue: Arc<LogQueue>,
        block_duration: Duration,
    ) -> Self {
        Self {
            classifier,
            blocklist,
            queue,
            block_duration,
        }
    }

    /// Classify one request and return its verdict.
    ///
    /// A request without a source address is answered with a WARN verdict and
    /// touches neither the blocklist nor the queue. Everything else is
    /// classified, enforced, and enqueued for delivery.
    pub async fn decide(&self, request: DecisionRequest) -> Verdict {
        let timestamp = chrono::Utc::now().timestamp();

        if request.ip.is_empty() {
            metrics::counter!("decisions_total", 1, "status" => "WARN");
            return Verdict::missing_ip(&request, timestamp);
        }

        let classification = self.classifier.classify(&request).await;

        // Enforce before the verdict leaves: a BLOCK verdict must always be
        // backed by a live blocklist entry. Repeat hits refresh the expiry.
        if classification.status == Status::Block {
            self.blocklist
                .block(&request.ip, classification.attack_type, self.block_duration)
                .await;
        }

        let verdict = Verdict::from_classification(&request, classification, timestamp);
        metrics::counter!("decisions_total", 1, "status" => verdict.status.as_str());

        self.queue.push(&verdict).await;
        verdict
    }
}
