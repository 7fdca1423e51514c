#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use threat_decision_engine::core::{Blocklist, Classifier, TrackerLimits};
use threat_decision_engine::engine::DecisionEngine;
use threat_decision_engine::queue::LogQueue;

/// Build a fresh engine on an in-process queue with default thresholds.
pub fn test_engine(
    block_duration: Duration,
) -> (Arc<DecisionEngine>, Arc<Blocklist>, Arc<LogQueue>) {
    test_engine_with_limits(block_duration, TrackerLimits::default())
}

/// Build a fresh engine with custom sliding-window thresholds.
pub fn test_engine_with_limits(
    block_duration: Duration,
    limits: TrackerLimits,
) -> (Arc<DecisionEngine>, Arc<Blocklist>, Arc<LogQueue>) {
    let blocklist = Arc::new(Blocklist::new());
    let queue = Arc::new(LogQueue::in_memory("test_queue"));
    let classifier = Classifier::new(limits, blocklist.clone(), None, None);
    let engine = Arc::new(DecisionEngine::new(
        classifier,
        blocklist.clone(),
        queue.clone(),
        block_duration,
    ));
    (engine, blocklist, queue)
}

/// Generate a random IP address for testing
pub fn random_ip() -> String {
    format!(
        "{}.{}.{}.{}",
        rand::random::<u8>(),
        rand::random::<u8>(),
        rand::random::<u8>(),
        rand::random::<u8>()
    )
}
