//! # Socketlink Traits
//!
//! Seams and value types shared by the client:
//!
//! - **Transport**: connect to an endpoint and exchange frames
//! - **ReconnectionStrategy**: control reconnection behavior after a loss
//! - **HeaderSet / HeaderOverrides**: the two header layers and their merge
//! - **SocketLinkError**: the crate-wide error type

pub mod error;
pub mod headers;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use error::{Result, SocketLinkError};
pub use headers::{merge, HeaderOverride, HeaderOverrides, HeaderSet};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
pub use transport::{FrameSink, FrameStream, Transport, WebSocketTransport, WsMessage};
