// crates/decouple-ingress/tests/transports/channel_tests.rs
// ============================================================================
// Module: Channel Transport Tests
// Description: Tests for the tokio channel transport.
// Purpose: Validate delivery, message ids, and close semantics.
// Dependencies: decouple-core, decouple-ingress, tokio
// ============================================================================

//! ## Overview
//! Exercises [`decouple_ingress::ChannelTopicFactory`] handles.

use decouple_core::HandleOpenError;
use decouple_core::Message;
use decouple_core::PublishError;
use decouple_core::TopicHandleFactory;
use decouple_ingress::ChannelTopicFactory;
use decouple_ingress::PublishedMessage;
use tokio::sync::mpsc;

use super::common::topic;

/// Tests publishes are delivered with sequential ids.
#[tokio::test]
async fn channel_handle_delivers_messages() {
    let (tx, mut rx) = mpsc::channel::<PublishedMessage>(4);
    let factory = ChannelTopicFactory::with_prefix(tx, "test");
    let handle = factory.open(&topic("topic-one")).unwrap();

    let first = handle.publish(Message::default()).await.unwrap();
    let second = handle.publish(Message::default()).await.unwrap();

    assert_eq!(first.message_id, "test-1");
    assert_eq!(second.message_id, "test-2");
    let delivered = rx.recv().await.unwrap();
    assert_eq!(delivered.topic_id, topic("topic-one"));
    assert_eq!(delivered.message_id, "test-1");
}

/// Tests a closed handle rejects new publishes.
#[tokio::test]
async fn channel_handle_rejects_after_close() {
    let (tx, _rx) = mpsc::channel::<PublishedMessage>(4);
    let handle = ChannelTopicFactory::new(tx).open(&topic("topic-one")).unwrap();

    handle.close();
    handle.close();

    let err = handle.publish(Message::default()).await.unwrap_err();
    assert_eq!(err, PublishError::Closed(topic("topic-one")));
}

/// Tests a dropped receiver fails opens and publishes.
#[tokio::test]
async fn channel_without_receiver_fails() {
    let (tx, rx) = mpsc::channel::<PublishedMessage>(4);
    let factory = ChannelTopicFactory::new(tx);
    let handle = factory.open(&topic("topic-one")).unwrap();
    drop(rx);

    let err = handle.publish(Message::default()).await.unwrap_err();
    assert!(matches!(err, PublishError::Transport(_)));
    assert!(matches!(
        factory.open(&topic("topic-one")).err(),
        Some(HandleOpenError::Unavailable(_))
    ));
}
