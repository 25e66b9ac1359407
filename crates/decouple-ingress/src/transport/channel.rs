// crates/decouple-ingress/src/transport/channel.rs
// ============================================================================
// Module: Channel Transport
// Description: In-process transport backed by a tokio channel.
// Purpose: Deliver published messages to an async receiver.
// Dependencies: decouple-core, tokio
// ============================================================================

//! ## Overview
//! [`ChannelTopicFactory`] opens handles that send [`PublishedMessage`] values
//! into a bounded `tokio::sync::mpsc` channel. A publish waits for channel
//! capacity and is acknowledged once the message is queued.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use decouple_core::HandleOpenError;
use decouple_core::Message;
use decouple_core::PublishAck;
use decouple_core::PublishError;
use decouple_core::TopicHandle;
use decouple_core::TopicHandleFactory;
use decouple_core::TopicId;
use tokio::sync::mpsc;

use crate::transport::AckSequence;
use crate::transport::CloseFlag;

// ============================================================================
// SECTION: Published Message
// ============================================================================

/// Message delivered by channel handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Topic the message was published to.
    pub topic_id: TopicId,
    /// Assigned message id.
    pub message_id: String,
    /// Encoded message.
    pub message: Message,
}

// ============================================================================
// SECTION: Channel Factory
// ============================================================================

/// Factory for channel-backed topic handles.
#[derive(Debug, Clone)]
pub struct ChannelTopicFactory {
    /// Sender shared by every handle.
    sender: mpsc::Sender<PublishedMessage>,
    /// Message id sequence shared by every handle.
    acks: Arc<AckSequence>,
}

impl ChannelTopicFactory {
    /// Creates a factory with the default `channel` id prefix.
    #[must_use]
    pub fn new(sender: mpsc::Sender<PublishedMessage>) -> Self {
        Self::with_prefix(sender, "channel")
    }

    /// Creates a factory with a custom message id prefix.
    #[must_use]
    pub fn with_prefix(sender: mpsc::Sender<PublishedMessage>, prefix: impl Into<String>) -> Self {
        Self {
            sender,
            acks: Arc::new(AckSequence::new(prefix)),
        }
    }
}

impl TopicHandleFactory for ChannelTopicFactory {
    fn open(&self, topic: &TopicId) -> Result<Arc<dyn TopicHandle>, HandleOpenError> {
        if self.sender.is_closed() {
            return Err(HandleOpenError::Unavailable("channel receiver dropped".to_string()));
        }
        Ok(Arc::new(ChannelTopicHandle {
            topic: topic.clone(),
            sender: self.sender.clone(),
            acks: Arc::clone(&self.acks),
            state: CloseFlag::default(),
        }))
    }
}

/// Handle publishing into a channel.
struct ChannelTopicHandle {
    /// Bound topic.
    topic: TopicId,
    /// Channel sender.
    sender: mpsc::Sender<PublishedMessage>,
    /// Message id sequence.
    acks: Arc<AckSequence>,
    /// Close state.
    state: CloseFlag,
}

#[async_trait]
impl TopicHandle for ChannelTopicHandle {
    fn topic_id(&self) -> &TopicId {
        &self.topic
    }

    async fn publish(&self, message: Message) -> Result<PublishAck, PublishError> {
        self.state.ensure_open(&self.topic)?;
        let message_id = self.acks.next_id();
        self.sender
            .send(PublishedMessage {
                topic_id: self.topic.clone(),
                message_id: message_id.clone(),
                message,
            })
            .await
            .map_err(|_| PublishError::Transport("channel receiver dropped".to_string()))?;
        Ok(PublishAck {
            message_id,
            topic_id: self.topic.clone(),
        })
    }

    fn close(&self) {
        self.state.close();
    }
}
