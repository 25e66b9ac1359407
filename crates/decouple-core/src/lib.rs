// crates/decouple-core/src/lib.rs
// ============================================================================
// Module: Decouple Core Library
// Description: Public API surface for the decouple ingress data model.
// Purpose: Expose identifiers, routes, events, and collaborator interfaces.
// Dependencies: crate::{identifiers, routing, event, trace, interfaces}
// ============================================================================

//! ## Overview
//! Decouple core defines the vocabulary shared by the ingress path: broker
//! identities, routing snapshots, CloudEvents, W3C trace context, and the
//! collaborator traits (routing tables, topic handle factories, encoders) that
//! the ingress crate composes. It carries no runtime state of its own.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod event;
pub mod identifiers;
pub mod interfaces;
pub mod routing;
pub mod trace;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use event::Event;
pub use event::EventData;
pub use event::EventError;
pub use identifiers::BrokerIdentity;
pub use identifiers::IdentityError;
pub use identifiers::TopicId;
pub use identifiers::TopicIdError;
pub use interfaces::EncodeError;
pub use interfaces::EventEncoder;
pub use interfaces::HandleOpenError;
pub use interfaces::Message;
pub use interfaces::PublishAck;
pub use interfaces::PublishError;
pub use interfaces::TopicHandle;
pub use interfaces::TopicHandleFactory;
pub use routing::BrokerRoute;
pub use routing::RouteState;
pub use routing::RoutingTable;
pub use trace::TraceContext;
pub use trace::TraceContextError;
