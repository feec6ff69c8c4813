use crate::core::config::TransportOptions;
use crate::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::core::events::{is_reserved, ClientEvent, EventHub};
use crate::core::frame::{InboundFrame, Method, RequestFrame};
use crate::core::registry::{RequestRegistry, Resolution};
use crate::core::request::{normalize_path, RequestDescriptor};
use crate::core::response::{JwrError, PendingResponse, Response};
use crate::traits::*;
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// An encoded request frame waiting to be written
#[derive(Debug)]
struct Outbound {
    id: u64,
    message: WsMessage,
}

/// Why the connected message loop returned
enum LoopExit {
    Shutdown,
    TransportLost(SocketLinkError),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub requests_sent: u64,
    pub responses_matched: u64,
    pub responses_unmatched: u64,
    pub requests_abandoned: u64,
    pub reconnect_count: u64,
    pub pending_requests: usize,
    pub connection_state: ConnectionState,
}

/// State shared between the client handle and its run loop
struct Shared {
    url: String,
    transport: Arc<dyn Transport>,
    transport_options: TransportOptions,
    reconnect_strategy: Arc<dyn ReconnectionStrategy>,
    default_headers: RwLock<HeaderSet>,
    registry: RequestRegistry,
    state: AtomicConnectionState,
    metrics: AtomicMetrics,
    events: EventHub,
    shutdown: Notify,
    /// Set by teardown or drop; holds the envelope error given to requests
    /// that arrive afterwards
    stop_reason: Mutex<Option<JwrError>>,
    /// Held here while no run loop owns it; requests queue up behind it
    command_rx: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
}

impl Shared {
    fn stop(&self, reason: JwrError) -> JwrError {
        *self.stop_reason.lock().get_or_insert(reason)
    }

    fn stop_reason(&self) -> Option<JwrError> {
        *self.stop_reason.lock()
    }

    /// Give the command receiver back for the next `connect()`, or close it
    /// if the client was stopped meanwhile
    fn release(&self, command_rx: mpsc::UnboundedReceiver<Outbound>) {
        let mut slot = self.command_rx.lock();
        if self.stop_reason().is_some() {
            drop(slot);
            finish(self, command_rx);
        } else {
            *slot = Some(command_rx);
        }
    }

    async fn open(&self) -> Result<(FrameSink, FrameStream)> {
        self.transport.connect(&self.url, &self.transport_options).await
    }
}

/// Request/response client over a single persistent socket
///
/// Many logical requests are multiplexed over one connection. Each request
/// carries a correlation id, and its response is delivered to the exact
/// [`PendingResponse`] that issued it, whatever order responses arrive in.
///
/// Requests issued before `connect()` or while reconnecting are queued and
/// written once the link is up. A request whose frame was already written
/// when the link drops resolves with status 0 and
/// [`JwrError::ConnectionLost`]; it is not replayed.
///
/// ```ignore
/// let client = socketlink::builder()
///     .url("ws://localhost:1337")
///     .header("x-test-header-one", "foo")
///     .build();
/// client.connect().await?;
///
/// let response = client.get("/hello").await?;
/// assert_eq!(response.status_code(), 200);
///
/// client.teardown().await?;
/// ```
pub struct SocketClient {
    shared: Arc<Shared>,
    command_tx: mpsc::UnboundedSender<Outbound>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SocketClient {
    /// Called by the builder's `build()` method
    pub(crate) fn new(
        url: String,
        default_headers: HeaderSet,
        transport: Arc<dyn Transport>,
        transport_options: TransportOptions,
        reconnect_strategy: Arc<dyn ReconnectionStrategy>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            url,
            transport,
            transport_options,
            reconnect_strategy,
            default_headers: RwLock::new(default_headers),
            registry: RequestRegistry::new(),
            state: AtomicConnectionState::new(ConnectionState::Disconnected),
            metrics: AtomicMetrics::new(),
            events: EventHub::new(),
            shutdown: Notify::new(),
            stop_reason: Mutex::new(None),
            command_rx: Mutex::new(Some(command_rx)),
        });

        Self {
            shared,
            command_tx,
            task_handle: Mutex::new(None),
        }
    }

    /// Open the connection
    ///
    /// Resolves once the transport is up and the `connect` event has fired.
    /// On failure the client stays disconnected, queued requests stay
    /// queued, and `connect()` may be called again. The same holds after the
    /// link was lost for good (reconnection disabled or exhausted). Only
    /// `teardown()` makes the client unusable.
    ///
    /// # Returns
    /// * `Ok(())` - Connected; queued requests are being written
    /// * `Err(InvalidState)` - Already connected or connecting, or torn down
    /// * `Err(ConnectFailed)` - The transport could not be opened
    pub async fn connect(&self) -> Result<()> {
        if self.shared.stop_reason().is_some() {
            return Err(SocketLinkError::InvalidState(
                "client has been stopped; create a new one".into(),
            ));
        }

        if let Err(current) = self
            .shared
            .state
            .compare_exchange(ConnectionState::Disconnected, ConnectionState::Connecting)
        {
            return Err(SocketLinkError::InvalidState(format!(
                "connect called while {}",
                current
            )));
        }

        let Some(command_rx) = self.shared.command_rx.lock().take() else {
            self.shared.state.set(ConnectionState::Disconnected);
            return Err(SocketLinkError::InvalidState("client is still shutting down".into()));
        };

        match self.shared.open().await {
            Ok((sink, stream)) => {
                if self.shared.stop_reason().is_some() {
                    // torn down while the transport was connecting
                    finish(&self.shared, command_rx);
                    return Err(SocketLinkError::InvalidState(
                        "client was stopped while connecting".into(),
                    ));
                }

                info!("Connected to {}", self.shared.url);
                self.shared.state.set(ConnectionState::Connected);
                self.shared.events.emit(ClientEvent::Connected);

                let shared = Arc::clone(&self.shared);
                let handle = tokio::spawn(async move {
                    run_client(shared, command_rx, sink, stream).await;
                });
                *self.task_handle.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect: {}", e);
                self.shared.state.set(ConnectionState::Disconnected);
                self.shared.release(command_rx);
                self.shared.events.emit(ClientEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Issue a request without waiting for it
    ///
    /// Returns as soon as the request is registered and queued. The returned
    /// future resolves exactly once, with the remote response or with a
    /// synthetic envelope if the connection is lost or torn down first.
    ///
    /// Errors only for invalid requests (empty or absolute URL).
    pub fn send(&self, request: RequestDescriptor) -> Result<PendingResponse> {
        let url = normalize_path(&request.url)?;
        let headers = merge(&self.shared.default_headers.read(), &request.headers);

        let (id, rx) = self.shared.registry.register(request.method, &url);
        let frame = RequestFrame {
            id,
            method: request.method,
            url,
            headers,
            data: request.body,
        };

        let message = match frame.encode() {
            Ok(message) => message,
            Err(e) => {
                self.shared.registry.discard(id);
                return Err(e);
            }
        };

        debug!(id, method = %frame.method, url = %frame.url, "Queueing request");

        if self.command_tx.send(Outbound { id, message }).is_err() {
            let reason = self.shared.stop_reason().unwrap_or(JwrError::TornDown);
            debug!(id, %reason, "Client stopped, failing request immediately");
            if self.shared.registry.abandon(id, reason) {
                self.shared.metrics.add_abandoned(1);
            }
        }

        Ok(PendingResponse::new(id, rx))
    }

    /// Issue a request and wait for its response
    pub async fn request(&self, request: RequestDescriptor) -> Result<Response> {
        Ok(self.send(request)?.await)
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request(RequestDescriptor::new(Method::Get, url)).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response> {
        self.request(RequestDescriptor::new(Method::Post, url).json(body)?)
            .await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response> {
        self.request(RequestDescriptor::new(Method::Put, url).json(body)?)
            .await
    }

    pub async fn delete(&self, url: &str) -> Result<Response> {
        self.request(RequestDescriptor::new(Method::Delete, url)).await
    }

    /// `get` with a JSON body, sent as the frame's `data`
    pub async fn get_with<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response> {
        self.request(RequestDescriptor::new(Method::Get, url).json(body)?)
            .await
    }

    /// `delete` with a JSON body, sent as the frame's `data`
    pub async fn delete_with<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response> {
        self.request(RequestDescriptor::new(Method::Delete, url).json(body)?)
            .await
    }

    /// Register a handler for a lifecycle event (`connect`, `disconnect`,
    /// `reconnecting`, `reconnect`, `error`) or a server-pushed event name
    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.shared.events.on(event, Arc::new(handler));
    }

    /// Remove every handler for `event`, returning how many were removed
    pub fn off(&self, event: &str) -> usize {
        self.shared.events.off(event)
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.shared.events.receiver().try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.shared.events.receiver().recv()
    }

    /// Current connection-wide default headers
    pub fn default_headers(&self) -> HeaderSet {
        self.shared.default_headers.read().clone()
    }

    /// Replace the default headers for requests issued from now on
    pub fn set_default_headers(&self, headers: HeaderSet) {
        *self.shared.default_headers.write() = headers;
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.shared.state.is_connected()
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn metrics(&self) -> Metrics {
        let metrics = &self.shared.metrics;
        Metrics {
            requests_sent: metrics.requests_sent(),
            responses_matched: metrics.responses_matched(),
            responses_unmatched: metrics.responses_unmatched(),
            requests_abandoned: metrics.requests_abandoned(),
            reconnect_count: metrics.reconnect_count(),
            pending_requests: self.shared.registry.len(),
            connection_state: self.shared.state.get(),
        }
    }

    /// Close the connection for good
    ///
    /// Every pending or queued request resolves with [`JwrError::TornDown`],
    /// the default headers are cleared, and the client cannot be reconnected.
    /// Calling it more than once is harmless.
    pub async fn teardown(&self) -> Result<()> {
        info!("Tearing down socket client for {}", self.shared.url);

        self.shared.stop(JwrError::TornDown);
        self.shared.shutdown.notify_one();

        let handle = self.task_handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Client task ended abnormally: {}", e);
            }
        }

        // Not owned by a run loop: never connected, failed, or lost for good
        let command_rx = self.shared.command_rx.lock().take();
        if let Some(command_rx) = command_rx {
            finish(&self.shared, command_rx);
        }

        // Registrations racing with the shutdown above
        let abandoned = self.shared.registry.abandon_all(JwrError::TornDown);
        self.shared.metrics.add_abandoned(abandoned);

        self.shared.default_headers.write().clear();
        self.shared.state.set(ConnectionState::Disconnected);
        Ok(())
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        self.shared.stop(JwrError::TornDown);
        self.shared.shutdown.notify_one();
        let command_rx = self.shared.command_rx.lock().take();
        if let Some(command_rx) = command_rx {
            finish(&self.shared, command_rx);
        }
    }
}

/// Connection run loop: serve the link, reconnect on loss, clean up on exit
async fn run_client(
    shared: Arc<Shared>,
    mut command_rx: mpsc::UnboundedReceiver<Outbound>,
    mut sink: FrameSink,
    mut stream: FrameStream,
) {
    let mut announce_disconnect = false;

    loop {
        match message_loop(&shared, &mut command_rx, &mut sink, &mut stream).await {
            LoopExit::Shutdown => {
                debug!("Shutdown requested, closing connection");
                let _ = sink.close().await;
                shared.events.emit(ClientEvent::Disconnected);
                break;
            }
            LoopExit::TransportLost(reason) => {
                warn!("Connection to {} lost: {}", shared.url, reason);
                drop(sink);
                drop(stream);

                let abandoned = shared.registry.abandon_written(JwrError::ConnectionLost);
                if abandoned > 0 {
                    info!("Abandoned {} in-flight requests after connection loss", abandoned);
                }
                shared.metrics.add_abandoned(abandoned);

                if !shared.reconnect_strategy.should_reconnect(0) {
                    info!("Auto-reconnect disabled");
                    announce_disconnect = true;
                    break;
                }

                shared.state.set(ConnectionState::Reconnecting);
                shared.events.emit(ClientEvent::Disconnected);

                match reconnect(&shared).await {
                    Some((new_sink, new_stream, attempts)) => {
                        info!("Reconnected to {} after {} attempts", shared.url, attempts);
                        sink = new_sink;
                        stream = new_stream;
                        shared.metrics.increment_reconnects();
                        shared.state.set(ConnectionState::Connected);
                        shared.events.emit(ClientEvent::Connected);
                        shared.events.emit(ClientEvent::Reconnected(attempts));
                    }
                    None => break,
                }
            }
        }
    }

    if shared.stop_reason().is_some() {
        finish(&shared, command_rx);
    } else {
        park(&shared, command_rx);
        if announce_disconnect {
            shared.events.emit(ClientEvent::Disconnected);
        }
    }
    info!("Client task exiting");
}

/// Serve an established link until it drops or shutdown is requested
async fn message_loop(
    shared: &Shared,
    command_rx: &mut mpsc::UnboundedReceiver<Outbound>,
    sink: &mut FrameSink,
    stream: &mut FrameStream,
) -> LoopExit {
    loop {
        if shared.stop_reason().is_some() {
            return LoopExit::Shutdown;
        }

        tokio::select! {
            biased;

            _ = shared.shutdown.notified() => {
                return LoopExit::Shutdown;
            }

            inbound = stream.next() => {
                match inbound {
                    Some(Ok(message)) => handle_inbound(shared, &message),
                    Some(Err(e)) => {
                        error!("Transport error: {}", e);
                        shared.events.emit(ClientEvent::Error(e.to_string()));
                        return LoopExit::TransportLost(e);
                    }
                    None => {
                        return LoopExit::TransportLost(SocketLinkError::ConnectionClosed(
                            "inbound stream ended".into(),
                        ));
                    }
                }
            }

            outbound = command_rx.recv() => {
                let Some(Outbound { id, message }) = outbound else {
                    // every client handle is gone
                    return LoopExit::Shutdown;
                };

                if !shared.registry.mark_written(id) {
                    debug!(id, "Request resolved before it was written, skipping");
                    continue;
                }

                if let Err(e) = sink.send(message).await {
                    error!(id, "Failed to write request frame: {}", e);
                    return LoopExit::TransportLost(e);
                }
                shared.metrics.increment_sent();
                debug!(id, "Request frame written");
            }
        }
    }
}

fn handle_inbound(shared: &Shared, message: &WsMessage) {
    match InboundFrame::decode(message) {
        Ok(InboundFrame::Response { id, body, jwr }) => {
            match shared.registry.resolve(id, Response { body, jwr }) {
                Resolution::Delivered => shared.metrics.increment_matched(),
                Resolution::UnknownId => shared.metrics.increment_unmatched(),
            }
        }
        Ok(InboundFrame::Event { name, data }) => {
            if is_reserved(&name) {
                warn!("Ignoring server event using reserved name '{}'", name);
            } else {
                debug!("Server event '{}'", name);
                shared.events.emit(ClientEvent::Message { event: name, data });
            }
        }
        Err(e) => warn!("Ignoring malformed frame: {}", e),
    }
}

/// Re-establish the link, following the reconnection strategy
///
/// Returns `None` when the strategy gives up or shutdown is requested.
async fn reconnect(shared: &Shared) -> Option<(FrameSink, FrameStream, usize)> {
    let mut attempt = 0;

    loop {
        if shared.stop_reason().is_some() {
            return None;
        }

        let Some(delay) = shared.reconnect_strategy.next_delay(attempt) else {
            warn!("Reconnection strategy exhausted after {} attempts, giving up", attempt);
            return None;
        };

        info!("Reconnecting in {:?} (attempt {})", delay, attempt + 1);
        shared.events.emit(ClientEvent::Reconnecting(attempt + 1));

        tokio::select! {
            _ = shared.shutdown.notified() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;

        let result = tokio::select! {
            _ = shared.shutdown.notified() => return None,
            result = shared.open() => result,
        };

        match result {
            Ok((sink, stream)) => return Some((sink, stream, attempt)),
            Err(e) => {
                warn!("Reconnection attempt {} failed: {}", attempt, e);
                shared.events.emit(ClientEvent::Error(e.to_string()));
            }
        }
    }
}

/// Link gone with no reconnection left: fail everything queued or pending
/// and hand the receiver back so `connect()` can start over
fn park(shared: &Shared, mut command_rx: mpsc::UnboundedReceiver<Outbound>) {
    while command_rx.try_recv().is_ok() {}

    let abandoned = shared.registry.abandon_all(JwrError::ConnectionLost);
    if abandoned > 0 {
        info!("Abandoned {} queued requests after giving up on the connection", abandoned);
    }
    shared.metrics.add_abandoned(abandoned);

    // Disconnected only once connect() can take the receiver again
    shared.release(command_rx);
    shared.state.set(ConnectionState::Disconnected);
}

/// Stop accepting requests for good and fail everything still queued or pending
fn finish(shared: &Shared, mut command_rx: mpsc::UnboundedReceiver<Outbound>) {
    let reason = shared.stop(JwrError::TornDown);

    command_rx.close();
    while command_rx.try_recv().is_ok() {}

    let abandoned = shared.registry.abandon_all(reason);
    if abandoned > 0 {
        info!("Abandoned {} requests ({})", abandoned, reason);
    }
    shared.metrics.add_abandoned(abandoned);
    shared.state.set(ConnectionState::Disconnected);
}
