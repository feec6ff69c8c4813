//! Transport capability
//!
//! The request layer only needs four things from the underlying socket:
//! connect, send a frame, receive frames, and notice when the link is gone
//! (the inbound stream ends or yields an error). [`Transport`] captures
//! exactly that, so the client can run over WebSockets or any other framed,
//! ordered, reliable link.

use crate::core::config::TransportOptions;
use crate::traits::error::{Result, SocketLinkError};
use async_trait::async_trait;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{http, Message};
use tokio_tungstenite::connect_async;
use tracing::{debug, warn};

/// A single transport frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, WsMessage::Text(_))
    }

    fn into_tungstenite(self) -> Message {
        match self {
            WsMessage::Text(text) => Message::Text(text),
            WsMessage::Binary(data) => Message::Binary(data),
        }
    }

    /// Control frames are handled by tungstenite and never surface here
    fn from_tungstenite(msg: Message) -> Option<Self> {
        match msg {
            Message::Text(text) => Some(WsMessage::Text(text)),
            Message::Binary(data) => Some(WsMessage::Binary(data)),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
        }
    }
}

/// Outbound half of an established link
pub type FrameSink = Pin<Box<dyn Sink<WsMessage, Error = SocketLinkError> + Send>>;

/// Inbound half of an established link; ends when the link is lost
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<WsMessage>> + Send>>;

/// Connects to a remote endpoint and hands back the two halves of the link
///
/// Called once by `connect()` and again for every reconnection attempt.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, url: &str, options: &TransportOptions) -> Result<(FrameSink, FrameStream)>;
}

/// WebSocket transport built on tokio-tungstenite
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, url: &str, options: &TransportOptions) -> Result<(FrameSink, FrameStream)> {
        let target = options.url_with_query(url);
        let connect_failed = |reason: String| SocketLinkError::ConnectFailed {
            url: target.clone(),
            reason,
        };

        let mut request = target
            .as_str()
            .into_client_request()
            .map_err(|e| connect_failed(e.to_string()))?;

        for (key, value) in options.handshake_headers.iter() {
            match (
                key.parse::<http::header::HeaderName>(),
                value.parse::<http::header::HeaderValue>(),
            ) {
                (Ok(name), Ok(value)) => {
                    request.headers_mut().insert(name, value);
                }
                _ => warn!("Skipping invalid handshake header '{}'", key),
            }
        }

        debug!("Opening WebSocket to {}", target);
        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| connect_failed(e.to_string()))?;

        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(|e| SocketLinkError::WebSocket(e.to_string()))
            .with(|msg: WsMessage| future::ready(Ok::<_, SocketLinkError>(msg.into_tungstenite())));

        let stream = read.filter_map(|msg| {
            future::ready(match msg {
                Ok(msg) => WsMessage::from_tungstenite(msg).map(Ok),
                Err(e) => Some(Err(SocketLinkError::WebSocket(e.to_string()))),
            })
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}
