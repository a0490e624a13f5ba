//! Error types for the datatag beacon.
//!
//! None of these ever reach a caller of the logging entry points. They exist for
//! construction, configuration, and the collaborator seams, where the dispatcher
//! catches them and degrades to "the event was not recorded".

use thiserror::Error;

/// Key-value storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Collection endpoint transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Collector returned status {0}")]
    Status(u16),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level errors for constructing and wiring a tagging manager
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No tokio runtime available to run the dispatch worker")]
    RuntimeUnavailable,

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
