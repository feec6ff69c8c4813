//! In-flight request table
//!
//! Maps correlation ids to the continuation of the request that carries them.
//! Every registered request is resolved exactly once: by its response, or by
//! one of the abandon calls when the connection goes away.
//!
//! The table is guarded by a single mutex. Only the client run loop and
//! request issuers touch it, and never for longer than a map operation.

use crate::core::frame::Method;
use crate::core::response::{JwrError, Response};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Outcome of [`RequestRegistry::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The pending request was found and completed
    Delivered,
    /// No pending request has this id (late, duplicate or stale frame)
    UnknownId,
}

struct PendingRequest {
    method: Method,
    url: String,
    /// Set once the request frame has been handed to the transport
    written: bool,
    continuation: oneshot::Sender<Response>,
}

struct RegistryInner {
    next_id: u64,
    pending: HashMap<u64, PendingRequest>,
}

/// Correlation-id table for one connection
pub struct RequestRegistry {
    inner: Mutex<RegistryInner>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next_id: 1,
                pending: HashMap::new(),
            }),
        }
    }

    /// Allocate a fresh correlation id and park a continuation under it
    ///
    /// Ids increase monotonically and skip any id still pending after a
    /// wrap, so an id is never shared by two pending requests.
    pub fn register(&self, method: Method, url: &str) -> (u64, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock();

        let id = loop {
            let candidate = inner.next_id;
            inner.next_id = inner.next_id.wrapping_add(1);
            if candidate != 0 && !inner.pending.contains_key(&candidate) {
                break candidate;
            }
        };

        inner.pending.insert(
            id,
            PendingRequest {
                method,
                url: url.to_string(),
                written: false,
                continuation: tx,
            },
        );
        (id, rx)
    }

    /// Record that the frame for `id` is about to be written
    ///
    /// Returns `false` if the request is no longer pending, in which case
    /// its frame must not be sent.
    pub fn mark_written(&self, id: u64) -> bool {
        match self.inner.lock().pending.get_mut(&id) {
            Some(entry) => {
                entry.written = true;
                true
            }
            None => false,
        }
    }

    /// Complete the request with this id
    pub fn resolve(&self, id: u64, response: Response) -> Resolution {
        let entry = self.inner.lock().pending.remove(&id);

        match entry {
            Some(entry) => {
                debug!(
                    id,
                    method = %entry.method,
                    url = %entry.url,
                    status = response.status_code(),
                    "Resolved request"
                );
                // A dropped receiver means the caller stopped waiting; the
                // request is still complete.
                let _ = entry.continuation.send(response);
                Resolution::Delivered
            }
            None => {
                warn!(id, "Ignoring response for unknown correlation id");
                Resolution::UnknownId
            }
        }
    }

    /// Fail a single request that can no longer be sent
    ///
    /// Returns `false` if it was already resolved.
    pub fn abandon(&self, id: u64, error: JwrError) -> bool {
        let entry = self.inner.lock().pending.remove(&id);
        match entry {
            Some(entry) => Self::fail(vec![(id, entry)], error) == 1,
            None => false,
        }
    }

    /// Drop a registration whose frame was never built
    pub(crate) fn discard(&self, id: u64) {
        self.inner.lock().pending.remove(&id);
    }

    /// Fail every request whose frame was already written
    ///
    /// Used on transport loss: written requests cannot be matched on a new
    /// link, while queued ones are still sent after reconnecting.
    pub fn abandon_written(&self, error: JwrError) -> usize {
        let drained: Vec<(u64, PendingRequest)> = {
            let mut inner = self.inner.lock();
            let ids: Vec<u64> = inner
                .pending
                .iter()
                .filter(|(_, entry)| entry.written)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| inner.pending.remove(&id).map(|entry| (id, entry)))
                .collect()
        };
        Self::fail(drained, error)
    }

    /// Fail every pending request, written or not
    pub fn abandon_all(&self, error: JwrError) -> usize {
        let drained: Vec<(u64, PendingRequest)> = self.inner.lock().pending.drain().collect();
        Self::fail(drained, error)
    }

    fn fail(entries: Vec<(u64, PendingRequest)>, error: JwrError) -> usize {
        let count = entries.len();
        for (id, entry) in entries {
            debug!(id, method = %entry.method, url = %entry.url, %error, "Abandoning request");
            let _ = entry.continuation.send(Response::failed(error));
        }
        count
    }

    pub fn contains(&self, id: u64) -> bool {
        self.inner.lock().pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn set_next_id(&self, next_id: u64) {
        self.inner.lock().next_id = next_id;
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}
