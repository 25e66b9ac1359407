// crates/decouple-ingress/src/routing/memory.rs
// ============================================================================
// Module: In-Memory Routing Table
// Description: Mutable routing table held in process memory.
// Purpose: Back tests and embedders that push routes programmatically.
// Dependencies: decouple-core
// ============================================================================

//! ## Overview
//! [`InMemoryRoutingTable`] stores routes behind a read-write lock. Lookups
//! clone the stored route so callers hold a stable snapshot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::PoisonError;
use std::sync::RwLock;

use decouple_core::BrokerIdentity;
use decouple_core::BrokerRoute;
use decouple_core::RoutingTable;

// ============================================================================
// SECTION: In-Memory Table
// ============================================================================

/// Routing table stored in memory.
#[derive(Debug, Default)]
pub struct InMemoryRoutingTable {
    /// Routes keyed by broker.
    routes: RwLock<HashMap<BrokerIdentity, BrokerRoute>>,
}

impl InMemoryRoutingTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table seeded with `routes`.
    #[must_use]
    pub fn from_routes(routes: impl IntoIterator<Item = (BrokerIdentity, BrokerRoute)>) -> Self {
        Self {
            routes: RwLock::new(routes.into_iter().collect()),
        }
    }

    /// Inserts or replaces the route for `broker`, returning the previous one.
    pub fn upsert(&self, broker: BrokerIdentity, route: BrokerRoute) -> Option<BrokerRoute> {
        self.routes.write().unwrap_or_else(PoisonError::into_inner).insert(broker, route)
    }

    /// Removes the route for `broker`, returning it.
    pub fn remove(&self, broker: &BrokerIdentity) -> Option<BrokerRoute> {
        self.routes.write().unwrap_or_else(PoisonError::into_inner).remove(broker)
    }

    /// Replaces every route at once.
    pub fn replace(&self, routes: impl IntoIterator<Item = (BrokerIdentity, BrokerRoute)>) {
        let next: HashMap<_, _> = routes.into_iter().collect();
        *self.routes.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when no routes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RoutingTable for InMemoryRoutingTable {
    fn lookup(&self, broker: &BrokerIdentity) -> Option<BrokerRoute> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).get(broker).cloned()
    }
}
