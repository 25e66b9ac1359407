// crates/decouple-ingress/src/transport/mod.rs
// ============================================================================
// Module: Decouple Transports
// Description: Reference topic handle factories.
// Purpose: Publish encoded events in-process, to a log, or to Pub/Sub.
// Dependencies: decouple-core, std
// ============================================================================

//! ## Overview
//! Each transport provides a [`decouple_core::TopicHandleFactory`] whose
//! `open` is cheap and performs no I/O. Handles share the close semantics
//! implemented by [`CloseFlag`]: publishes started after `close` fail with
//! [`PublishError::Closed`], publishes already running complete.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use decouple_core::PublishError;
use decouple_core::TopicId;

// ============================================================================
// SECTION: Shared Handle State
// ============================================================================

/// Close state shared by transport handles.
#[derive(Debug, Default)]
pub(crate) struct CloseFlag {
    /// Set once the handle is closed.
    closed: AtomicBool,
}

impl CloseFlag {
    /// Marks the handle closed. Returns true on the first call only.
    pub(crate) fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Fails when the handle is closed.
    pub(crate) fn ensure_open(&self, topic: &TopicId) -> Result<(), PublishError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PublishError::Closed(topic.clone()));
        }
        Ok(())
    }
}

/// Builds sequential message identifiers.
#[derive(Debug)]
pub(crate) struct AckSequence {
    /// Prefix embedded in message ids.
    prefix: String,
    /// Monotonic counter.
    counter: AtomicU64,
}

impl AckSequence {
    /// Creates a sequence with the provided prefix.
    pub(crate) fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Returns the next message id.
    pub(crate) fn next_id(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, seq)
    }
}

// ============================================================================
// SECTION: Implementations
// ============================================================================

pub mod channel;
pub mod log;
pub mod pubsub;

pub use channel::ChannelTopicFactory;
pub use channel::PublishedMessage;
pub use log::LogTopicFactory;
pub use pubsub::PubSubHttpConfig;
pub use pubsub::PubSubHttpFactory;
