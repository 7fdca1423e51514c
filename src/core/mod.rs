//! Core functionality for the threat decision engine.
//! This module contains the attack classifier, the per-address blocklist,
//! the rolling request counters, and the verdict data model.

mod blocklist;
mod classifier;
mod request_tracker;
mod verdict;

pub use blocklist::Blocklist;
pub use classifier::Classifier;
pub use request_tracker::{ActivitySnapshot, RequestTracker, TrackerLimits};
pub use verdict::{AttackType, Classification, DecisionRequest, Severity, Status, Verdict};
