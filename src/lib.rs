//! Threat decision engine: classifies per-request security telemetry against
//! a fixed attack taxonomy, enforces time-bounded IP blocks, and relays
//! verdict records to storage and a downstream collector through a
//! degrade-gracefully delivery pipeline.

pub mod api;
pub mod config;
pub mod core;
pub mod engine;
pub mod intel;
pub mod queue;
pub mod relay;
pub mod storage;
pub mod utils;
pub mod worker;
