// crates/decouple-ingress/tests/transports/pubsub_tests.rs
// ============================================================================
// Module: Pub/Sub Transport Tests
// Description: Tests for the Pub/Sub REST publisher against a local server.
// Purpose: Validate request shape, authorization, and response handling.
// Dependencies: decouple-core, decouple-ingress, tiny_http, tokio
// ============================================================================

//! ## Overview
//! Exercises [`decouple_ingress::PubSubHttpFactory`] with a `tiny_http`
//! server standing in for the Pub/Sub endpoint.

use std::collections::BTreeMap;
use std::thread;
use std::thread::JoinHandle;

use bytes::Bytes;
use decouple_core::HandleOpenError;
use decouple_core::Message;
use decouple_core::PublishError;
use decouple_core::TopicHandleFactory;
use decouple_ingress::PubSubHttpConfig;
use decouple_ingress::PubSubHttpFactory;
use serde_json::Value;
use tiny_http::Response;
use tiny_http::Server;

use super::common::topic;

/// Request observed by the fake endpoint.
struct CapturedRequest {
    /// Request path.
    url: String,
    /// Authorization header value.
    authorization: Option<String>,
    /// Parsed JSON body.
    body: Value,
}

/// Serves one request with `status` and `body`, returning what it saw.
fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<CapturedRequest>) {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let endpoint = format!("http://{}", server.server_addr());
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request");
        let authorization = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_string());
        let mut raw = String::new();
        request.as_reader().read_to_string(&mut raw).expect("body");
        let captured = CapturedRequest {
            url: request.url().to_string(),
            authorization,
            body: serde_json::from_str(&raw).expect("json body"),
        };
        request.respond(Response::from_string(body).with_status_code(status)).expect("respond");
        captured
    });
    (endpoint, handle)
}

/// Builds a factory for `endpoint`.
fn factory(endpoint: String, project: Option<&str>) -> PubSubHttpFactory {
    PubSubHttpFactory::new(PubSubHttpConfig {
        endpoint,
        project_id: project.map(str::to_string),
        auth_token: Some("secret".to_string()),
        ..PubSubHttpConfig::default()
    })
    .unwrap()
}

/// Tests a publish posts the expected request and returns the server id.
#[tokio::test]
async fn pubsub_publish_posts_to_topic() {
    let (endpoint, server) = serve_once(200, r#"{"messageIds":["4242"]}"#);
    let handle = factory(endpoint, Some("test-project")).open(&topic("topic-one")).unwrap();
    let message = Message {
        data: Bytes::from_static(b"hello"),
        attributes: BTreeMap::from([("ce-id".to_string(), "evt-1".to_string())]),
    };

    let ack = handle.publish(message).await.unwrap();
    let captured = server.join().expect("server thread");

    assert_eq!(ack.message_id, "4242");
    assert_eq!(ack.topic_id, topic("topic-one"));
    assert_eq!(captured.url, "/v1/projects/test-project/topics/topic-one:publish");
    assert_eq!(captured.authorization.as_deref(), Some("Bearer secret"));
    assert_eq!(captured.body["messages"][0]["data"], "aGVsbG8=");
    assert_eq!(captured.body["messages"][0]["attributes"]["ce-id"], "evt-1");
}

/// Tests qualified topic ids keep their own project.
#[tokio::test]
async fn pubsub_qualified_topic_ignores_default_project() {
    let (endpoint, server) = serve_once(200, r#"{"messageIds":["1"]}"#);
    let handle = factory(endpoint, Some("test-project"))
        .open(&topic("projects/other-project/topics/topic-two"))
        .unwrap();

    handle.publish(Message::default()).await.unwrap();
    let captured = server.join().expect("server thread");

    assert_eq!(captured.url, "/v1/projects/other-project/topics/topic-two:publish");
}

/// Tests server errors map to retryable rejections.
#[tokio::test]
async fn pubsub_server_error_is_rejected() {
    let (endpoint, server) = serve_once(503, "backend unavailable");
    let handle = factory(endpoint, Some("test-project")).open(&topic("topic-one")).unwrap();

    let err = handle.publish(Message::default()).await.unwrap_err();
    server.join().expect("server thread");

    assert_eq!(
        err,
        PublishError::Rejected {
            status: 503,
            message: "backend unavailable".to_string()
        }
    );
    assert!(err.is_retryable());
}

/// Tests short topic ids need a project.
#[test]
fn pubsub_short_topic_without_project_fails_open() {
    let factory = factory("http://127.0.0.1:9".to_string(), None);
    let err = factory.open(&topic("topic-one")).err();
    assert!(matches!(err, Some(HandleOpenError::InvalidTopic { .. })));
    assert!(factory.open(&topic("projects/p1/topics/topic-one")).is_ok());
}

/// Tests invalid endpoints are rejected when building the factory.
#[test]
fn pubsub_rejects_invalid_endpoint() {
    let err = PubSubHttpFactory::new(PubSubHttpConfig {
        endpoint: "not a url".to_string(),
        ..PubSubHttpConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, HandleOpenError::Unavailable(_)));
}

/// Tests a closed handle never reaches the network.
#[tokio::test]
async fn pubsub_closed_handle_rejects_publish() {
    let handle = factory("http://127.0.0.1:9".to_string(), Some("p1"))
        .open(&topic("topic-one"))
        .unwrap();
    handle.close();
    let err = handle.publish(Message::default()).await.unwrap_err();
    assert_eq!(err, PublishError::Closed(topic("topic-one")));
}
