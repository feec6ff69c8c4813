//! # Client core
//!
//! The request registry, wire frames, configuration and the client itself.

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod events;
pub mod frame;
pub mod registry;
pub mod request;
pub mod response;

// Re-export main types
pub use builder::{states, SocketClientBuilder};
pub use client::{Metrics, SocketClient};
pub use config::{ClientConfig, ConfigError, ReconnectConfig, TransportOptions};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use events::{ClientEvent, EventHandler};
pub use frame::{InboundFrame, Method, RequestFrame};
pub use registry::{RequestRegistry, Resolution};
pub use request::RequestDescriptor;
pub use response::{Jwr, JwrError, PendingResponse, Response, DEFAULT_STATUS, SYNTHETIC_STATUS};

/// Create a new client builder
///
/// # Example
/// ```ignore
/// let client = socketlink::builder()
///     .url("ws://localhost:1337")
///     .header("x-test-header-one", "foo")
///     .reconnect_strategy(FixedDelay::new(Duration::from_millis(200), Some(5)))
///     .build();
/// client.connect().await?;
/// ```
pub fn builder() -> SocketClientBuilder<states::NoUrl> {
    SocketClientBuilder::new()
}

/// Build a client from configuration and connect it
pub async fn connect(config: ClientConfig) -> crate::traits::Result<SocketClient> {
    config.validate()?;
    let client = SocketClientBuilder::from(config).build();
    client.connect().await?;
    Ok(client)
}
