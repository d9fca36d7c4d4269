//! Error types for the node coordinator

use thiserror::Error;

use chargemesh_core::ChargeMeshError;

/// Errors raised while loading or validating a node configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur in the node coordinator
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from the mesh, codec, or cache layers
    #[error(transparent)]
    Core(#[from] ChargeMeshError),

    /// Node not started
    #[error("Node not started")]
    NotStarted,

    /// Node already started
    #[error("Node already started")]
    AlreadyStarted,

    /// Trigger channel closed or full
    #[error("Channel error: {0}")]
    Channel(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for NodeError {
    fn from(e: tokio::sync::mpsc::error::SendError<T>) -> Self {
        NodeError::Channel(format!("Trigger send error: {}", e))
    }
}

/// Result type alias for node operations
pub type NodeResult<T> = Result<T, NodeError>;
