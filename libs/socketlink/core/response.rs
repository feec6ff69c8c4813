//! Response envelope (JWR) and the future handed back to request issuers

use crate::traits::{HeaderSet, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Status code used when the remote omits one
pub const DEFAULT_STATUS: u16 = 200;

/// Status code of envelopes synthesized locally (never sent by a server)
pub const SYNTHETIC_STATUS: u16 = 0;

/// Why a request was resolved locally instead of by the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwrError {
    /// The transport went away after the request frame was written
    ConnectionLost,
    /// The client was torn down while the request was pending
    TornDown,
}

impl fmt::Display for JwrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JwrError::ConnectionLost => f.write_str("connection lost"),
            JwrError::TornDown => f.write_str("client torn down"),
        }
    }
}

/// JSON WebSocket Response envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jwr {
    pub status_code: u16,
    /// Response headers reported by the remote, if any
    pub headers: HeaderSet,
    /// Set only on locally synthesized envelopes
    pub error: Option<JwrError>,
}

impl Jwr {
    pub fn new(status_code: Option<u16>, headers: HeaderSet) -> Self {
        Self {
            status_code: status_code.unwrap_or(DEFAULT_STATUS),
            headers,
            error: None,
        }
    }

    pub(crate) fn synthetic(error: JwrError) -> Self {
        Self {
            status_code: SYNTHETIC_STATUS,
            headers: HeaderSet::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// A completed request: the body plus its envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub body: Value,
    pub jwr: Jwr,
}

impl Response {
    pub(crate) fn failed(error: JwrError) -> Self {
        Self {
            body: Value::Null,
            jwr: Jwr::synthetic(error),
        }
    }

    #[inline]
    pub fn status_code(&self) -> u16 {
        self.jwr.status_code
    }

    /// Deserialize the body into a typed value
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Resolves exactly once with the [`Response`] for one issued request
///
/// Returned immediately by `SocketClient::send`; the request is already on
/// its way (or queued) whether or not this future is polled.
#[must_use = "dropping a PendingResponse discards the response, not the request"]
pub struct PendingResponse {
    id: u64,
    rx: oneshot::Receiver<Response>,
}

impl PendingResponse {
    pub(crate) fn new(id: u64, rx: oneshot::Receiver<Response>) -> Self {
        Self { id, rx }
    }

    /// Correlation id carried by the request frame
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Future for PendingResponse {
    type Output = Response;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Sender dropped unresolved only when the runtime itself went away
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Response::failed(JwrError::ConnectionLost)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_missing_status_defaults_to_200() {
        let jwr = Jwr::new(None, HeaderSet::new());
        assert_eq!(jwr.status_code, 200);
        assert!(jwr.is_success());
        assert!(jwr.error.is_none());
    }

    #[test]
    fn test_synthetic_envelope_is_not_success() {
        let response = Response::failed(JwrError::TornDown);
        assert_eq!(response.status_code(), SYNTHETIC_STATUS);
        assert!(!response.jwr.is_success());
        assert_eq!(response.jwr.error, Some(JwrError::TornDown));
        assert!(response.body.is_null());
    }

    #[test]
    fn test_typed_body() {
        #[derive(Deserialize)]
        struct Foo {
            foo: String,
        }

        let response = Response {
            body: json!({"foo": "bar"}),
            jwr: Jwr::new(Some(200), HeaderSet::new()),
        };
        let foo: Foo = response.json().unwrap();
        assert_eq!(foo.foo, "bar");
        assert!(response.json::<Vec<u8>>().is_err());
    }

    #[tokio::test]
    async fn test_pending_response_survives_dropped_sender() {
        let (tx, rx) = oneshot::channel();
        let pending = PendingResponse::new(7, rx);
        assert_eq!(pending.id(), 7);
        drop(tx);

        let response = pending.await;
        assert_eq!(response.jwr.error, Some(JwrError::ConnectionLost));
    }
}
