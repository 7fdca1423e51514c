use thiserror::Error;

/// Custom error types for the threat decision engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Preferred queue backend errors
    #[error("Queue backend error: {0}")]
    Queue(#[from] redis::RedisError),

    /// Verdict storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Downstream relay errors
    #[error("Relay error: {0}")]
    Relay(String),

    /// Invalid request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Result type for threat decision engine operations
pub type EngineResult<T> = Result<T, EngineError>;

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Relay(err.to_string())
    }
}

impl From<mongodb::error::Error> for EngineError {
    fn from(err: mongodb::error::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<bson::ser::Error> for EngineError {
    fn from(err: bson::ser::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Internal(err.to_string())
    }
}
