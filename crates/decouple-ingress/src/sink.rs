// crates/decouple-ingress/src/sink.rs
// ============================================================================
// Module: Decouple Sink
// Description: Entry point forwarding broker-addressed events to topics.
// Purpose: Resolve, encode, publish, and classify failures for each event.
// Dependencies: decouple-core, tokio
// ============================================================================

//! ## Overview
//! [`DecoupleSink`] resolves the broker through its [`TopicCache`], encodes the
//! event with the configured [`EventEncoder`], publishes it, and waits for the
//! transport acknowledgement. It keeps no state beyond the cache.
//! Invariants:
//! - Success is returned only after the transport acknowledges the message.
//! - Publishes are never retried internally.
//! - A timed-out or dropped send leaves the cache unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use decouple_core::BrokerIdentity;
use decouple_core::Event;
use decouple_core::EventEncoder;
use decouple_core::PublishAck;
use decouple_core::RoutingTable;
use decouple_core::TopicHandleFactory;
use decouple_core::TraceContext;
use thiserror::Error;

use crate::cache::TopicCache;
use crate::encoder::BinaryEventEncoder;
use crate::error::DecoupleError;

// ============================================================================
// SECTION: Send Context
// ============================================================================

/// Per-call options for [`DecoupleSink::send`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendContext {
    /// Trace context propagated with the event.
    pub trace: Option<TraceContext>,
    /// Publish timeout overriding the sink default.
    pub timeout: Option<Duration>,
}

impl SendContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a trace context.
    #[must_use]
    pub fn with_trace(mut self, trace: TraceContext) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Sets a per-call publish timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Errors returned when building a [`DecoupleSink`].
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// No routing table was configured.
    #[error("decouple sink routing table is not configured")]
    MissingRoutingTable,
    /// No topic handle factory was configured.
    #[error("decouple sink topic factory is not configured")]
    MissingTopicFactory,
}

/// Builder for a [`DecoupleSink`].
///
/// # Invariants
/// - `build` succeeds only when a routing table and topic factory are set.
/// - The encoder defaults to [`BinaryEventEncoder`].
#[derive(Default)]
pub struct DecoupleSinkBuilder {
    /// Routing view for broker lookups.
    routing_table: Option<Arc<dyn RoutingTable>>,
    /// Factory for topic handles.
    topic_factory: Option<Arc<dyn TopicHandleFactory>>,
    /// Event encoder.
    encoder: Option<Arc<dyn EventEncoder>>,
    /// Default publish timeout.
    publish_timeout: Option<Duration>,
}

impl DecoupleSinkBuilder {
    /// Sets the routing table.
    #[must_use]
    pub fn routing_table(mut self, table: impl RoutingTable + 'static) -> Self {
        self.routing_table = Some(Arc::new(table));
        self
    }

    /// Sets the topic handle factory.
    #[must_use]
    pub fn topic_factory(mut self, factory: impl TopicHandleFactory + 'static) -> Self {
        self.topic_factory = Some(Arc::new(factory));
        self
    }

    /// Sets the event encoder.
    #[must_use]
    pub fn encoder(mut self, encoder: impl EventEncoder + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Sets the default publish timeout.
    #[must_use]
    pub const fn publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = Some(timeout);
        self
    }

    /// Builds the sink.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when a required collaborator is missing.
    pub fn build(self) -> Result<DecoupleSink, BuildError> {
        let routing = self.routing_table.ok_or(BuildError::MissingRoutingTable)?;
        let factory = self.topic_factory.ok_or(BuildError::MissingTopicFactory)?;
        Ok(DecoupleSink {
            cache: TopicCache::new(routing, factory),
            encoder: self.encoder.unwrap_or_else(|| Arc::new(BinaryEventEncoder)),
            publish_timeout: self.publish_timeout,
        })
    }
}

// ============================================================================
// SECTION: Decouple Sink
// ============================================================================

/// Forwards events to the decouple topic of their broker.
pub struct DecoupleSink {
    /// Broker to handle cache.
    cache: TopicCache,
    /// Event encoder.
    encoder: Arc<dyn EventEncoder>,
    /// Default publish timeout.
    publish_timeout: Option<Duration>,
}

impl DecoupleSink {
    /// Returns a builder for the sink.
    #[must_use]
    pub fn builder() -> DecoupleSinkBuilder {
        DecoupleSinkBuilder::default()
    }

    /// Creates a sink from an existing cache and encoder.
    #[must_use]
    pub fn new(cache: TopicCache, encoder: Arc<dyn EventEncoder>) -> Self {
        Self {
            cache,
            encoder,
            publish_timeout: None,
        }
    }

    /// Sends `event` to broker `namespace/broker`.
    ///
    /// # Errors
    ///
    /// Returns [`DecoupleError`] as described for [`DecoupleSink::send_to`].
    pub async fn send(
        &self,
        namespace: &str,
        broker: &str,
        event: &Event,
        ctx: &SendContext,
    ) -> Result<PublishAck, DecoupleError> {
        self.send_to(&BrokerIdentity::new(namespace, broker), event, ctx).await
    }

    /// Sends `event` to `broker` and waits for the transport acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns the cache error when the broker cannot be resolved,
    /// [`DecoupleError::Encode`] or [`DecoupleError::Publish`] for collaborator
    /// failures, and [`DecoupleError::Cancelled`] when the timeout elapses.
    pub async fn send_to(
        &self,
        broker: &BrokerIdentity,
        event: &Event,
        ctx: &SendContext,
    ) -> Result<PublishAck, DecoupleError> {
        let handle = self.cache.get_or_create(broker)?;
        let message = self.encoder.encode(event, ctx.trace.as_ref())?;
        let publish = handle.publish(message);
        let ack = match ctx.timeout.or(self.publish_timeout) {
            Some(timeout) => tokio::time::timeout(timeout, publish).await.map_err(|_| {
                DecoupleError::Cancelled {
                    timeout,
                }
            })??,
            None => publish.await?,
        };
        Ok(ack)
    }

    /// Returns the topic cache.
    #[must_use]
    pub const fn topic_cache(&self) -> &TopicCache {
        &self.cache
    }

    /// Closes every cached handle. Returns the number closed.
    ///
    /// # Errors
    ///
    /// Returns [`DecoupleError::Internal`] when the cache lock is poisoned.
    pub fn shutdown(&self) -> Result<usize, DecoupleError> {
        self.cache.close_all()
    }
}
