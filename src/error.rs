//! Crate-level error type

use crate::cache::CacheError;
use thiserror::Error;

/// Errors from the runtime around the load lifecycle.
///
/// Load failures the user sees are not errors here; they are reported as
/// `LoadEvent::Failed` by the lifecycle.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("engine channel closed")]
    ChannelClosed,

    #[error("bridge driver stopped")]
    DriverStopped,

    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
