// crates/decouple-ingress/tests/transports/log_tests.rs
// ============================================================================
// Module: Log Transport Tests
// Description: Tests for the JSON-lines log transport.
// Purpose: Validate record format and write failure handling.
// Dependencies: decouple-core, decouple-ingress, serde_json
// ============================================================================

//! ## Overview
//! Exercises [`decouple_ingress::LogTopicFactory`] handles.

use std::collections::BTreeMap;

use bytes::Bytes;
use decouple_core::Message;
use decouple_core::PublishError;
use decouple_core::TopicHandleFactory;
use decouple_ingress::LogTopicFactory;
use serde_json::Value;

use super::common::FailingWriter;
use super::common::SharedBuffer;
use super::common::topic;

/// Tests each publish writes one JSON line.
#[tokio::test]
async fn log_handle_writes_json_lines() {
    let buffer = SharedBuffer::default();
    let factory = LogTopicFactory::new(buffer.clone());
    let handle = factory.open(&topic("topic-one")).unwrap();
    let message = Message {
        data: Bytes::from_static(b"hello"),
        attributes: BTreeMap::from([("ce-id".to_string(), "evt-1".to_string())]),
    };

    let ack = handle.publish(message.clone()).await.unwrap();
    handle.publish(message).await.unwrap();

    assert_eq!(ack.message_id, "log-1");
    let output = buffer.to_string_lossy();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    let record: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["topic"], "topic-one");
    assert_eq!(record["message_id"], "log-1");
    assert_eq!(record["attributes"]["ce-id"], "evt-1");
    assert_eq!(record["data_base64"], "aGVsbG8=");
}

/// Tests writer failures surface as transport errors.
#[tokio::test]
async fn log_handle_reports_write_failures() {
    let handle = LogTopicFactory::new(FailingWriter).open(&topic("topic-one")).unwrap();
    let err = handle.publish(Message::default()).await.unwrap_err();
    assert!(matches!(err, PublishError::Transport(_)));
}

/// Tests a closed handle writes nothing.
#[tokio::test]
async fn log_handle_rejects_after_close() {
    let buffer = SharedBuffer::default();
    let handle = LogTopicFactory::new(buffer.clone()).open(&topic("topic-one")).unwrap();
    handle.close();
    let err = handle.publish(Message::default()).await.unwrap_err();
    assert_eq!(err, PublishError::Closed(topic("topic-one")));
    assert!(buffer.to_string_lossy().is_empty());
}
