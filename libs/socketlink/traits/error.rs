use crate::core::config::ConfigError;
use thiserror::Error;

/// Main error type for socketlink
///
/// Only connection setup, request validation and configuration loading
/// surface errors. A request that was accepted always completes with a
/// response envelope, even when the connection goes away.
#[derive(Error, Debug)]
pub enum SocketLinkError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Initial connection attempt failed
    #[error("Failed to connect to {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    /// Request rejected before it was issued
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Inbound frame does not follow the request/response protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Frame could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file loading error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidState(String),

    /// Frame could not be handed to an in-process channel
    #[error("Channel send error: {0}")]
    ChannelSend(String),
}

/// Result type for socketlink operations
pub type Result<T> = std::result::Result<T, SocketLinkError>;
