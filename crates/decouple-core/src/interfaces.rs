// crates/decouple-core/src/interfaces.rs
// ============================================================================
// Module: Decouple Interfaces
// Description: Transport-agnostic collaborator interfaces for the ingress path.
// Purpose: Define topic handles, handle factories, and event encoders.
// Dependencies: crate::{event, identifiers, trace}, async-trait, bytes
// ============================================================================

//! ## Overview
//! Interfaces define how the ingress path talks to a message transport
//! without embedding transport details. A [`TopicHandleFactory`] opens
//! [`TopicHandle`] values; an [`EventEncoder`] turns events into transport
//! [`Message`] values.
//! Invariants:
//! - [`TopicHandleFactory::open`] performs no network I/O; handles connect
//!   lazily on first publish.
//! - A handle rejects publishes started after [`TopicHandle::close`] but lets
//!   publishes already in progress complete.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::event::Event;
use crate::identifiers::TopicId;
use crate::trace::TraceContext;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Transport message produced by an [`EventEncoder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Message body.
    pub data: Bytes,
    /// Message attributes.
    pub attributes: BTreeMap<String, String>,
}

/// Transport acknowledgement for a published message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    /// Transport-assigned message identifier.
    pub message_id: String,
    /// Topic the message was accepted by.
    pub topic_id: TopicId,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when opening a topic handle.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleOpenError {
    /// Topic cannot be addressed by this transport.
    #[error("topic {topic} cannot be opened: {reason}")]
    InvalidTopic {
        /// Topic that was requested.
        topic: TopicId,
        /// Reason the topic is unusable.
        reason: String,
    },
    /// Transport is unavailable.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

impl HandleOpenError {
    /// Returns true when retrying later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors raised by [`TopicHandle::publish`].
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// Handle was closed before the publish started.
    #[error("topic handle {0} is closed")]
    Closed(TopicId),
    /// Transport failed to deliver the message.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Transport rejected the message.
    #[error("transport rejected message (status {status}): {message}")]
    Rejected {
        /// Transport status code.
        status: u16,
        /// Transport-provided detail.
        message: String,
    },
}

impl PublishError {
    /// Returns true when retrying later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Closed(_) | Self::Transport(_) => true,
            Self::Rejected {
                status, ..
            } => *status == 429 || *status >= 500,
        }
    }
}

/// Errors raised by [`EventEncoder::encode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Event failed validation.
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    /// Event could not be serialized.
    #[error("event serialization failed: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Topic Handles
// ============================================================================

/// Publishable, closable reference to a single topic.
#[async_trait]
pub trait TopicHandle: Send + Sync {
    /// Returns the topic this handle was opened against.
    fn topic_id(&self) -> &TopicId;

    /// Publishes a message and waits for the transport acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the handle is closed or delivery fails.
    async fn publish(&self, message: Message) -> Result<PublishAck, PublishError>;

    /// Stops accepting new publishes. Safe to call more than once.
    fn close(&self);
}

/// Opens topic handles.
pub trait TopicHandleFactory: Send + Sync {
    /// Opens a handle for `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`HandleOpenError`] when the topic cannot be addressed.
    fn open(&self, topic: &TopicId) -> Result<Arc<dyn TopicHandle>, HandleOpenError>;
}

impl<T: TopicHandleFactory + ?Sized> TopicHandleFactory for Arc<T> {
    fn open(&self, topic: &TopicId) -> Result<Arc<dyn TopicHandle>, HandleOpenError> {
        (**self).open(topic)
    }
}

// ============================================================================
// SECTION: Encoders
// ============================================================================

/// Serializes events plus trace context into transport messages.
pub trait EventEncoder: Send + Sync {
    /// Encodes `event`, attaching `trace` when present.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the event is invalid or cannot be serialized.
    fn encode(&self, event: &Event, trace: Option<&TraceContext>) -> Result<Message, EncodeError>;
}

impl<T: EventEncoder + ?Sized> EventEncoder for Arc<T> {
    fn encode(&self, event: &Event, trace: Option<&TraceContext>) -> Result<Message, EncodeError> {
        (**self).encode(event, trace)
    }
}
