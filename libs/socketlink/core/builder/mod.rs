pub mod states;

use crate::core::client::SocketClient;
use crate::core::config::{ClientConfig, ReconnectConfig, TransportOptions};
use crate::traits::*;
use states::*;
use std::sync::Arc;

/// Type-state builder for [`SocketClient`]
///
/// `build()` is only available once `url()` has been called.
pub struct SocketClientBuilder<U>
where
    U: UrlState,
{
    _state: TypeState<U>,
    url: Option<String>,
    default_headers: HeaderSet,
    transport: Option<Arc<dyn Transport>>,
    transport_options: TransportOptions,
    reconnect_strategy: Option<Arc<dyn ReconnectionStrategy>>,
}

impl SocketClientBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            default_headers: HeaderSet::new(),
            transport: None,
            transport_options: TransportOptions::default(),
            reconnect_strategy: None,
        }
    }

    /// Set the socket URL (required)
    ///
    /// # Arguments
    /// * `url` - Endpoint handed to the transport, e.g. `ws://localhost:1337`
    ///
    /// # Returns
    /// A builder on which `build()` is available
    pub fn url(self, url: impl Into<String>) -> SocketClientBuilder<HasUrl> {
        SocketClientBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            default_headers: self.default_headers,
            transport: self.transport,
            transport_options: self.transport_options,
            reconnect_strategy: self.reconnect_strategy,
        }
    }
}

impl Default for SocketClientBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<U> SocketClientBuilder<U>
where
    U: UrlState,
{
    /// Replace the connection-wide default headers
    pub fn default_headers(mut self, headers: HeaderSet) -> Self {
        self.default_headers = headers;
        self
    }

    /// Add one connection-wide default header
    ///
    /// # Arguments
    /// * `name` - Header name, stored lowercased
    /// * `value` - Header value; a later call with the same name replaces it
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Set the reconnection strategy
    ///
    /// # Arguments
    /// * `strategy` - Consulted after every transport loss
    ///   (defaults to `ReconnectConfig::default()`)
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Arc::new(strategy));
        self
    }

    /// Disable auto-reconnect; after a loss the client stays disconnected
    /// until `connect()` is called again
    pub fn no_reconnect(self) -> Self {
        self.reconnect_strategy(NeverReconnect)
    }

    /// Use a custom transport instead of the WebSocket one
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the handshake headers and query parameters
    ///
    /// # Arguments
    /// * `options` - Passed to the transport on every connect
    pub fn transport_options(mut self, options: TransportOptions) -> Self {
        self.transport_options = options;
        self
    }

    /// Add a header to the socket upgrade request
    pub fn handshake_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.transport_options.handshake_headers.insert(name, value);
        self
    }

    /// Add a query parameter to the socket URL
    ///
    /// # Arguments
    /// * `key` - Parameter name
    /// * `value` - Parameter value, appended as given
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.transport_options.query.insert(key.into(), value.into());
        self
    }
}

// Build method - only available when the URL is set
impl SocketClientBuilder<HasUrl> {
    /// Build the client
    ///
    /// # Returns
    /// A disconnected [`SocketClient`]; requests sent before `connect()` are queued
    pub fn build(self) -> SocketClient {
        let reconnect_strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Arc::from(ReconnectConfig::default().strategy()));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport));

        SocketClient::new(
            self.url.unwrap_or_default(),
            self.default_headers,
            transport,
            self.transport_options,
            reconnect_strategy,
        )
    }
}

impl From<ClientConfig> for SocketClientBuilder<HasUrl> {
    fn from(config: ClientConfig) -> Self {
        SocketClientBuilder::new()
            .url(config.url)
            .default_headers(config.headers)
            .transport_options(config.transport)
            .with_strategy(Arc::from(config.reconnect.strategy()))
    }
}

impl SocketClientBuilder<HasUrl> {
    fn with_strategy(mut self, strategy: Arc<dyn ReconnectionStrategy>) -> Self {
        self.reconnect_strategy = Some(strategy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_options() {
        let client = SocketClientBuilder::new()
            .header("X-Test-Header-One", "foo")
            .url("ws://localhost:1337")
            .header("x-test-header-two", "bar")
            .handshake_header("origin", "http://localhost")
            .query("__sdk", "rust")
            .no_reconnect()
            .build();

        assert_eq!(client.url(), "ws://localhost:1337");
        let headers = client.default_headers();
        assert_eq!(headers.get("x-test-header-one"), Some("foo"));
        assert_eq!(headers.get("x-test-header-two"), Some("bar"));
    }

    #[test]
    fn test_from_config() {
        let config = ClientConfig::from_yaml_str(
            "url: ws://localhost:1337\nheaders:\n  x-test-header-one: foo\n",
        )
        .unwrap();
        let client = SocketClientBuilder::from(config).build();
        assert_eq!(client.default_headers().get("x-test-header-one"), Some("foo"));
    }
}
