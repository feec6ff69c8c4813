//! # Socketlink
//!
//! HTTP-style requests over one persistent socket connection.
//!
//! Requests are framed with a correlation id and multiplexed over a single
//! WebSocket. Responses are routed back to the caller that issued them, in
//! whatever order they arrive.
//!
//! ## Features
//!
//! - **Correlated requests**: every request resolves exactly once
//! - **Header layering**: connection defaults with per-request overrides and removals
//! - **Auto-reconnect**: pluggable reconnection strategies, queued requests survive a drop
//! - **Events**: lifecycle and server-pushed events via handlers or a channel
//! - **Type-state builder**: a client cannot be built without an endpoint
//!
//! ## Example
//!
//! ```rust,ignore
//! use socketlink::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = socketlink::builder()
//!         .url("ws://localhost:1337")
//!         .header("x-test-header-one", "foo")
//!         .build();
//!     client.connect().await?;
//!
//!     let response = client.get("/someJSON").await?;
//!     println!("{} {}", response.status_code(), response.body);
//!
//!     let response = client
//!         .request(RequestDescriptor::new(Method::Get, "/headers").without_header("x-test-header-one"))
//!         .await?;
//!     println!("{}", response.body);
//!
//!     client.teardown().await
//! }
//! ```

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder, client, config, connect, connection_state, events, frame, registry, request, response,
    builder::{states, SocketClientBuilder},
    client::{Metrics, SocketClient},
    config::{ClientConfig, ConfigError, ReconnectConfig, TransportOptions},
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    events::ClientEvent,
    frame::Method,
    request::RequestDescriptor,
    response::{Jwr, JwrError, PendingResponse, Response, DEFAULT_STATUS, SYNTHETIC_STATUS},
};
