// crates/decouple-core/src/routing.rs
// ============================================================================
// Module: Decouple Routing Model
// Description: Broker routes and the routing table collaborator interface.
// Purpose: Describe where a broker's events go and whether it is provisioned.
// Dependencies: crate::identifiers, serde
// ============================================================================

//! ## Overview
//! A [`RoutingTable`] is an externally maintained, read-only view mapping a
//! [`BrokerIdentity`] to its [`BrokerRoute`]. Lookups return owned snapshot
//! values; callers never observe a table mid-update.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::BrokerIdentity;

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Provisioning state of a broker as reported by the control plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    /// Backing resources are not provisioned yet.
    #[default]
    Unready,
    /// Broker is provisioned and accepts events.
    Ready,
}

/// Route snapshot for a single broker.
///
/// # Invariants
/// - `topic_id` is raw control-plane data and may be empty or malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerRoute {
    /// Provisioning state.
    pub state: RouteState,
    /// Decouple topic identifier (unvalidated).
    #[serde(default)]
    pub topic_id: String,
}

impl BrokerRoute {
    /// Creates a ready route targeting `topic_id`.
    #[must_use]
    pub fn ready(topic_id: impl Into<String>) -> Self {
        Self {
            state: RouteState::Ready,
            topic_id: topic_id.into(),
        }
    }

    /// Creates an unready route targeting `topic_id`.
    #[must_use]
    pub fn unready(topic_id: impl Into<String>) -> Self {
        Self {
            state: RouteState::Unready,
            topic_id: topic_id.into(),
        }
    }

    /// Returns true when the broker is provisioned.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == RouteState::Ready
    }
}

// ============================================================================
// SECTION: Routing Table
// ============================================================================

/// Read-only broker routing view.
///
/// Implementations must be safe to query concurrently from many threads.
pub trait RoutingTable: Send + Sync {
    /// Returns the current route for `broker`, if any.
    fn lookup(&self, broker: &BrokerIdentity) -> Option<BrokerRoute>;
}

impl<T: RoutingTable + ?Sized> RoutingTable for Arc<T> {
    fn lookup(&self, broker: &BrokerIdentity) -> Option<BrokerRoute> {
        (**self).lookup(broker)
    }
}
