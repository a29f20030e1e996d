//! Unified error taxonomy for the router.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("context provider failed: {0}")]
    ProviderFailure(String),

    #[error("sink failed: {0}")]
    SinkFailure(String),

    #[error("broker transport failed: {0}")]
    TransportFailure(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RouterError>;
