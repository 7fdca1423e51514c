//! Utility modules for the threat decision engine.
//! This module contains common utilities used across the application.

mod error;
mod logging;

pub use logging::{
    create_request_span,
    init_logging,
    log_backend_event,
    log_block_event,
    log_delivery,
    log_detection,
};

pub use error::{EngineError, EngineResult};
