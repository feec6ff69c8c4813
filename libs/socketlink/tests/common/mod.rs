#![allow(dead_code)]

//! Common test utilities for socketlink integration tests
//!
//! A mock socket server speaking the JSON request/response frames, with a
//! handful of routes mirroring a small web app.

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// How long `/slow` waits before answering
pub const SLOW_ROUTE_DELAY: Duration = Duration::from_millis(200);

/// A mock socket server for testing
///
/// Routes:
/// - `/hello` answers `"ok!"`
/// - `/someJSON` answers `{"foo": "bar"}`
/// - `/someError` answers `{"blah": "blah"}` with status 501
/// - `/headers`, `/headersOverride`, `/headersRemove` echo the request headers
/// - `/echo` answers with the method and body it received
/// - `/slow` answers after [`SLOW_ROUTE_DELAY`]
/// - `/never` never answers
/// - `/drop` closes the connection without answering
/// - `/emit` pushes a `chat` event carrying the request body, then answers
/// - `/stray` answers once under an id nobody asked for, then normally
/// - anything else answers 404
pub struct MockSocketServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    connections: Arc<AtomicUsize>,
}

impl MockSocketServer {
    /// Create and start a new mock server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let connections = Arc::new(AtomicUsize::new(0));

        let shutdown_clone = shutdown.clone();
        let connections_clone = connections.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                connections_clone.fetch_add(1, Ordering::SeqCst);
                                let shutdown = shutdown_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            connections,
        }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, shutdown: Arc<Notify>) {
        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        // Delayed replies are written from their own tasks
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Value>();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                                continue;
                            };
                            let path = frame["url"].as_str().unwrap_or_default().to_string();

                            match path.as_str() {
                                "/never" => {}
                                "/drop" => break,
                                "/slow" => {
                                    let reply_tx = reply_tx.clone();
                                    tokio::spawn(async move {
                                        tokio::time::sleep(SLOW_ROUTE_DELAY).await;
                                        let _ = reply_tx.send(reply(&frame, json!("slow"), 200));
                                    });
                                }
                                "/emit" => {
                                    let event = json!({"event": "chat", "data": frame["data"]});
                                    let _ = reply_tx.send(event);
                                    let _ = reply_tx.send(reply(&frame, json!("emitted"), 200));
                                }
                                "/stray" => {
                                    let mut stray = reply(&frame, json!("stray"), 200);
                                    stray["id"] = json!(u32::MAX);
                                    let _ = reply_tx.send(stray);
                                    let _ = reply_tx.send(reply(&frame, json!("ok!"), 200));
                                }
                                _ => {
                                    let (body, status) = route(&path, &frame);
                                    let _ = reply_tx.send(reply(&frame, body, status));
                                }
                            }
                        }
                        Some(Ok(msg)) if msg.is_close() => break,
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    }
                }
                outbound = reply_rx.recv() => {
                    let Some(outbound) = outbound else { break };
                    if write.send(Message::Text(outbound.to_string())).await.is_err() {
                        break;
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of socket connections accepted so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Shutdown the server and every open connection
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockSocketServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn route(path: &str, frame: &Value) -> (Value, u16) {
    match path {
        "/hello" => (json!("ok!"), 200),
        "/someJSON" => (json!({"foo": "bar"}), 200),
        "/someError" => (json!({"blah": "blah"}), 501),
        "/headers" | "/headersOverride" | "/headersRemove" => (frame["headers"].clone(), 200),
        "/echo" => (
            json!({"method": frame["method"], "data": frame.get("data").cloned().unwrap_or(Value::Null)}),
            200,
        ),
        _ => (json!({"error": "not found"}), 404),
    }
}

fn reply(frame: &Value, body: Value, status: u16) -> Value {
    json!({
        "id": frame["id"],
        "body": body,
        "statusCode": status,
        "headers": {"content-type": "application/json"},
    })
}
