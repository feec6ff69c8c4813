//! Integration tests for the request layer
//!
//! These tests issue requests against a mock server and check responses,
//! header merging, correlation under concurrency and teardown.

mod common;

use common::MockSocketServer;
use serde::Deserialize;
use serde_json::json;
use socketlink::{
    ClientEvent, ConnectionState, HeaderSet, JwrError, Method, RequestDescriptor, SocketClient,
    SocketLinkError, SYNTHETIC_STATUS,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn connected_client(server: &MockSocketServer) -> SocketClient {
    let client = socketlink::builder()
        .url(server.ws_url())
        .header("x-test-header-one", "foo")
        .header("x-test-header-two", "bar")
        .build();
    client.connect().await.unwrap();
    client
}

#[tokio::test]
async fn test_get_plain_text() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    let response = client.get("/hello").await.unwrap();
    assert_eq!(response.body, "ok!");
    assert_eq!(response.status_code(), 200);
    assert!(response.jwr.is_success());
    assert_eq!(response.jwr.headers.get("content-type"), Some("application/json"));

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_get_json_body() {
    #[derive(Deserialize)]
    struct Foo {
        foo: String,
    }

    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    let response = client.get("/someJSON").await.unwrap();
    assert_eq!(response.body, json!({"foo": "bar"}));
    assert_eq!(response.json::<Foo>().unwrap().foo, "bar");

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_error_status_is_a_response() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    let response = client.get("/someError").await.unwrap();
    assert_eq!(response.status_code(), 501);
    assert_eq!(response.body, json!({"blah": "blah"}));
    assert!(!response.jwr.is_success());
    assert_eq!(response.jwr.error, None);

    let missing = client.get("/nowhere").await.unwrap();
    assert_eq!(missing.status_code(), 404);

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_default_headers_are_sent() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    let response = client.get("/headers").await.unwrap();
    assert_eq!(response.body["x-test-header-one"], "foo");
    assert_eq!(response.body["x-test-header-two"], "bar");

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_request_header_overrides_default() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    let response = client
        .request(RequestDescriptor::new(Method::Get, "/headersOverride").header("X-Test-Header-One", "baz"))
        .await
        .unwrap();
    assert_eq!(response.body["x-test-header-one"], "baz");
    assert_eq!(response.body["x-test-header-two"], "bar");

    // Defaults are untouched by the override
    assert_eq!(client.default_headers().get("x-test-header-one"), Some("foo"));

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_request_header_removes_default() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    let response = client
        .request(RequestDescriptor::new(Method::Get, "/headersRemove").without_header("x-test-header-one"))
        .await
        .unwrap();
    assert!(response.body.get("x-test-header-one").is_none());
    assert_eq!(response.body["x-test-header-two"], "bar");

    // An empty value is a removal too
    let response = client
        .request(RequestDescriptor::new(Method::Get, "/headersRemove").header("x-test-header-two", ""))
        .await
        .unwrap();
    assert_eq!(response.body["x-test-header-one"], "foo");
    assert!(response.body.get("x-test-header-two").is_none());

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_changed_defaults_apply_to_later_requests() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    client.set_default_headers(HeaderSet::new().with("x-session", "abc"));
    let response = client.get("/headers").await.unwrap();
    assert_eq!(response.body, json!({"x-session": "abc"}));

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_routes_without_default_headers() {
    let server = MockSocketServer::start().await;
    let client = socketlink::builder().url(server.ws_url()).build();
    client.connect().await.unwrap();

    let response = client.get("/hello").await.unwrap();
    assert_eq!(response.body, json!("ok!"));
    assert_eq!(response.status_code(), 200);

    let response = client.get("/someJSON").await.unwrap();
    assert_eq!(response.body, json!({"foo": "bar"}));
    assert_eq!(response.status_code(), 200);

    let response = client.get("/someError").await.unwrap();
    assert_eq!(response.body, json!({"blah": "blah"}));
    assert_eq!(response.status_code(), 501);

    let response = client.get("/headers").await.unwrap();
    assert_eq!(response.body, json!({}));

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_methods_and_bodies_reach_the_server() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    let response = client.post("/echo", &json!({"title": "a"})).await.unwrap();
    assert_eq!(response.body, json!({"method": "post", "data": {"title": "a"}}));

    let response = client.put("echo", &vec![1, 2, 3]).await.unwrap();
    assert_eq!(response.body, json!({"method": "put", "data": [1, 2, 3]}));

    let response = client.delete("/echo").await.unwrap();
    assert_eq!(response.body, json!({"method": "delete", "data": null}));

    let response = client.delete_with("/echo", &json!({"id": 3})).await.unwrap();
    assert_eq!(response.body, json!({"method": "delete", "data": {"id": 3}}));

    let response = client.get_with("/echo", &json!({"q": "x"})).await.unwrap();
    assert_eq!(response.body, json!({"method": "get", "data": {"q": "x"}}));

    let response = client
        .request(RequestDescriptor::new("patch".parse().unwrap(), "/echo").body(json!(7)))
        .await
        .unwrap();
    assert_eq!(response.body, json!({"method": "patch", "data": 7}));

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_urls_are_rejected() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    assert!(matches!(client.get("").await, Err(SocketLinkError::InvalidRequest(_))));
    assert!(matches!(
        client.get("http://example.com/hello").await,
        Err(SocketLinkError::InvalidRequest(_))
    ));
    assert_eq!(client.metrics().pending_requests, 0);

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_responses_routed_in_arrival_order() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    let slow = client.send(RequestDescriptor::new(Method::Get, "/slow")).unwrap();
    let fast = client.send(RequestDescriptor::new(Method::Get, "/hello")).unwrap();
    assert_ne!(slow.id(), fast.id());

    let order = Arc::new(Mutex::new(Vec::new()));
    let slow_order = Arc::clone(&order);
    let fast_order = Arc::clone(&order);

    let (slow, fast) = tokio::join!(
        async move {
            let response = slow.await;
            slow_order.lock().unwrap().push("slow");
            response
        },
        async move {
            let response = fast.await;
            fast_order.lock().unwrap().push("fast");
            response
        },
    );

    assert_eq!(slow.body, "slow");
    assert_eq!(fast.body, "ok!");
    assert_eq!(*order.lock().unwrap(), vec!["fast", "slow"]);

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_many_concurrent_requests_each_get_their_response() {
    let server = MockSocketServer::start().await;
    let client = Arc::new(connected_client(&server).await);

    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let response = client.post("/echo", &json!({"n": i})).await.unwrap();
                assert_eq!(response.body["data"]["n"], i);
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(client.metrics().responses_matched, 50);

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_requests_issued_before_connect_are_flushed() {
    let server = MockSocketServer::start().await;
    let client = socketlink::builder().url(server.ws_url()).build();

    let early = client.send(RequestDescriptor::new(Method::Get, "/hello")).unwrap();
    assert_eq!(client.metrics().pending_requests, 1);

    client.connect().await.unwrap();
    let response = tokio::time::timeout(Duration::from_secs(5), early).await.unwrap();
    assert_eq!(response.body, "ok!");

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_teardown_abandons_pending_requests() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    let pending = client.send(RequestDescriptor::new(Method::Get, "/never")).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.teardown().await.unwrap();

    let response = pending.await;
    assert_eq!(response.status_code(), SYNTHETIC_STATUS);
    assert_eq!(response.jwr.error, Some(JwrError::TornDown));
    assert_eq!(response.body, serde_json::Value::Null);

    assert!(client.default_headers().is_empty());
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert_eq!(client.metrics().pending_requests, 0);

    // Terminal: later requests fail at once and the client cannot reconnect
    let late = client.get("/hello").await.unwrap();
    assert_eq!(late.jwr.error, Some(JwrError::TornDown));
    assert!(matches!(client.connect().await, Err(SocketLinkError::InvalidState(_))));

    // Idempotent
    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_teardown_before_connect() {
    let client = socketlink::builder().url("ws://127.0.0.1:1").build();
    let queued = client.send(RequestDescriptor::new(Method::Get, "/hello")).unwrap();

    client.teardown().await.unwrap();
    assert_eq!(queued.await.jwr.error, Some(JwrError::TornDown));
}

#[tokio::test]
async fn test_server_events_reach_handlers() {
    let server = MockSocketServer::start().await;
    let client = connected_client(&server).await;

    let received = Arc::new(Mutex::new(Vec::new()));
    let received_clone = Arc::clone(&received);
    client.on("chat", move |data| {
        received_clone.lock().unwrap().push(data.clone());
    });

    let response = client.post("/emit", &json!({"text": "hi"})).await.unwrap();
    assert_eq!(response.body, "emitted");

    // The event frame precedes the response on the wire
    assert_eq!(*received.lock().unwrap(), vec![json!({"text": "hi"})]);

    let events: Vec<_> = std::iter::from_fn(|| client.try_recv_event()).collect();
    assert!(events.contains(&ClientEvent::Message {
        event: "chat".to_string(),
        data: json!({"text": "hi"}),
    }));

    assert_eq!(client.off("chat"), 1);
    client.post("/emit", &json!({"text": "again"})).await.unwrap();
    assert_eq!(received.lock().unwrap().len(), 1);

    client.teardown().await.unwrap();
}

#[tokio::test]
async fn test_connect_from_config() {
    let server = MockSocketServer::start().await;
    let yaml = format!(
        "url: {}\nheaders:\n  X-Test-Header-One: foo\nreconnect:\n  enabled: false\n",
        server.ws_url()
    );
    let config = socketlink::ClientConfig::from_yaml_str(&yaml).unwrap();

    let client = socketlink::connect(config).await.unwrap();
    let response = client.get("/headers").await.unwrap();
    assert_eq!(response.body, json!({"x-test-header-one": "foo"}));

    client.teardown().await.unwrap();
}
