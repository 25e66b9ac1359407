// crates/decouple-ingress/src/lib.rs
// ============================================================================
// Module: Decouple Ingress Library
// Description: Topic cache, decouple sink, encoders, routing tables, transports.
// Purpose: Forward broker-addressed events to their decouple topics.
// Dependencies: decouple-core, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! Decouple ingress resolves a broker to its current decouple topic through a
//! [`TopicCache`], encodes the event with an [`decouple_core::EventEncoder`],
//! and publishes it on a [`decouple_core::TopicHandle`]. [`DecoupleSink`] is
//! the entry point; routing tables and transports are pluggable.
//! Invariants:
//! - At most one live topic handle exists per broker.
//! - A replaced handle is closed exactly once, after its successor is cached.
//! - Every failure is returned as a [`DecoupleError`]; nothing is retried.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod encoder;
pub mod error;
pub mod routing;
pub mod sink;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::TopicCache;
pub use cache::classify_route;
pub use encoder::BinaryEventEncoder;
pub use error::DecoupleError;
pub use error::ErrorKind;
pub use routing::FileRoutingTable;
pub use routing::InMemoryRoutingTable;
pub use routing::MIN_REFRESH_INTERVAL;
pub use routing::RoutingLoadError;
pub use routing::RoutingSnapshot;
pub use sink::BuildError;
pub use sink::DecoupleSink;
pub use sink::DecoupleSinkBuilder;
pub use sink::SendContext;
pub use transport::ChannelTopicFactory;
pub use transport::LogTopicFactory;
pub use transport::PubSubHttpConfig;
pub use transport::PubSubHttpFactory;
pub use transport::PublishedMessage;
