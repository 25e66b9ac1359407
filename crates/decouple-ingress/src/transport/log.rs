// crates/decouple-ingress/src/transport/log.rs
// ============================================================================
// Module: Log Transport
// Description: Transport writing one JSON line per published message.
// Purpose: Dry-run and audit publishing without a message queue.
// Dependencies: decouple-core, base64, serde_json
// ============================================================================

//! ## Overview
//! [`LogTopicFactory`] opens handles that serialize each message as a JSON
//! line on a shared writer. The body is base64 encoded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use decouple_core::HandleOpenError;
use decouple_core::Message;
use decouple_core::PublishAck;
use decouple_core::PublishError;
use decouple_core::TopicHandle;
use decouple_core::TopicHandleFactory;
use decouple_core::TopicId;
use serde_json::json;

use crate::transport::AckSequence;
use crate::transport::CloseFlag;

// ============================================================================
// SECTION: Log Factory
// ============================================================================

/// Factory for log-backed topic handles.
pub struct LogTopicFactory<W> {
    /// Writer shared by every handle.
    writer: Arc<Mutex<W>>,
    /// Message id sequence shared by every handle.
    acks: Arc<AckSequence>,
}

impl<W: Write + Send + 'static> LogTopicFactory<W> {
    /// Creates a factory writing to `writer`.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            acks: Arc::new(AckSequence::new("log")),
        }
    }
}

impl<W: Write + Send + 'static> TopicHandleFactory for LogTopicFactory<W> {
    fn open(&self, topic: &TopicId) -> Result<Arc<dyn TopicHandle>, HandleOpenError> {
        Ok(Arc::new(LogTopicHandle {
            topic: topic.clone(),
            writer: Arc::clone(&self.writer),
            acks: Arc::clone(&self.acks),
            state: CloseFlag::default(),
        }))
    }
}

/// Handle writing messages to a log.
struct LogTopicHandle<W> {
    /// Bound topic.
    topic: TopicId,
    /// Shared writer.
    writer: Arc<Mutex<W>>,
    /// Message id sequence.
    acks: Arc<AckSequence>,
    /// Close state.
    state: CloseFlag,
}

#[async_trait]
impl<W: Write + Send + 'static> TopicHandle for LogTopicHandle<W> {
    fn topic_id(&self) -> &TopicId {
        &self.topic
    }

    async fn publish(&self, message: Message) -> Result<PublishAck, PublishError> {
        self.state.ensure_open(&self.topic)?;
        let message_id = self.acks.next_id();
        let record = json!({
            "topic": self.topic.as_str(),
            "message_id": message_id,
            "attributes": message.attributes,
            "data_base64": STANDARD.encode(&message.data),
        });
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| PublishError::Transport("log writer lock poisoned".to_string()))?;
        serde_json::to_writer(&mut *guard, &record)
            .map_err(|err| PublishError::Transport(err.to_string()))?;
        writeln!(guard).map_err(|err| PublishError::Transport(err.to_string()))?;
        guard.flush().map_err(|err| PublishError::Transport(err.to_string()))?;
        drop(guard);
        Ok(PublishAck {
            message_id,
            topic_id: self.topic.clone(),
        })
    }

    fn close(&self) {
        self.state.close();
    }
}
