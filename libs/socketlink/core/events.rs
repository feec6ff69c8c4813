//! Lifecycle and server-pushed event delivery
//!
//! Events reach callers two ways:
//! - handlers registered by name with `on()`, called from the client task
//! - a bounded crossbeam channel drained with `recv_event()` / `try_recv_event()`

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const EVENT_CONNECT: &str = "connect";
pub const EVENT_DISCONNECT: &str = "disconnect";
pub const EVENT_RECONNECTING: &str = "reconnecting";
pub const EVENT_RECONNECT: &str = "reconnect";
pub const EVENT_ERROR: &str = "error";

const RESERVED_EVENTS: [&str; 5] = [
    EVENT_CONNECT,
    EVENT_DISCONNECT,
    EVENT_RECONNECTING,
    EVENT_RECONNECT,
    EVENT_ERROR,
];

/// Events beyond this many unread are dropped from the channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Events emitted by the client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Connected to the server (first connection and every reconnection)
    Connected,
    /// Transport lost or torn down
    Disconnected,
    /// About to make reconnection attempt N (1-based)
    Reconnecting(usize),
    /// Reconnected after N attempts
    Reconnected(usize),
    /// Server-pushed event frame
    Message { event: String, data: Value },
    /// Transport error
    Error(String),
}

impl ClientEvent {
    /// Name handlers are registered under
    pub fn name(&self) -> &str {
        match self {
            ClientEvent::Connected => EVENT_CONNECT,
            ClientEvent::Disconnected => EVENT_DISCONNECT,
            ClientEvent::Reconnecting(_) => EVENT_RECONNECTING,
            ClientEvent::Reconnected(_) => EVENT_RECONNECT,
            ClientEvent::Message { event, .. } => event,
            ClientEvent::Error(_) => EVENT_ERROR,
        }
    }

    /// Argument handed to handlers
    pub fn payload(&self) -> Value {
        match self {
            ClientEvent::Connected | ClientEvent::Disconnected => Value::Null,
            ClientEvent::Reconnecting(n) | ClientEvent::Reconnected(n) => Value::from(*n as u64),
            ClientEvent::Message { data, .. } => data.clone(),
            ClientEvent::Error(reason) => Value::String(reason.clone()),
        }
    }
}

/// Lifecycle names cannot be claimed by server-pushed events
pub fn is_reserved(name: &str) -> bool {
    RESERVED_EVENTS.contains(&name)
}

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

pub(crate) struct EventHub {
    handlers: RwLock<HashMap<String, Vec<EventHandler>>>,
    tx: Sender<ClientEvent>,
    rx: Receiver<ClientEvent>,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
        Self {
            handlers: RwLock::new(HashMap::new()),
            tx,
            rx,
        }
    }

    pub(crate) fn on(&self, name: &str, handler: EventHandler) {
        self.handlers
            .write()
            .entry(name.to_string())
            .or_default()
            .push(handler);
    }

    pub(crate) fn off(&self, name: &str) -> usize {
        self.handlers
            .write()
            .remove(name)
            .map(|handlers| handlers.len())
            .unwrap_or(0)
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        let handlers = self.handlers.read().get(event.name()).cloned();
        if let Some(handlers) = handlers {
            let payload = event.payload();
            for handler in handlers {
                handler(&payload);
            }
        }

        if let Err(TrySendError::Full(event)) = self.tx.try_send(event) {
            debug!("Event channel full, dropping '{}' event", event.name());
        }
    }

    pub(crate) fn receiver(&self) -> &Receiver<ClientEvent> {
        &self.rx
    }
}
