//! Error types for ChargeMesh
//!
//! None of these are fatal to a running node. Every call site logs the error
//! and drops the offending frame, send, or publication; the next periodic
//! tick or trigger picks up from there.

use thiserror::Error;

/// Top-level error type for ChargeMesh
#[derive(Debug, Error)]
pub enum ChargeMeshError {
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

/// Errors related to node addresses and tokens
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid address format: {0}")]
    InvalidFormat(String),

    #[error("Invalid address length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors raised while decoding a mesh frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Payload length violates the command's size contract
    #[error("Malformed {command} frame: unexpected size {len}")]
    MalformedSize { command: &'static str, len: usize },

    /// Tag byte is not a known command
    #[error("Unknown command tag: {0:#04x}")]
    UnknownCommand(u8),
}

/// Errors raised by the route table cache
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The cache lock could not be obtained within the configured bound
    #[error("Route table lock unavailable after {waited_ms} ms")]
    LockUnavailable { waited_ms: u64 },
}

/// Errors related to the mesh transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Send to {peer} timed out after {timeout_ms} ms")]
    Timeout { peer: String, timeout_ms: u64 },

    #[error("Peer not connected: {0}")]
    PeerNotConnected(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// Errors returned by the message broker bridge
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Broker not connected")]
    NotConnected,

    #[error("Publish to {topic} rejected: {reason}")]
    Rejected { topic: String, reason: String },
}

/// Result type alias for ChargeMesh operations
pub type ChargeMeshResult<T> = Result<T, ChargeMeshError>;
