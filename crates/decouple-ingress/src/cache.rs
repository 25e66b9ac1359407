// crates/decouple-ingress/src/cache.rs
// ============================================================================
// Module: Decouple Topic Cache
// Description: Per-broker topic handle cache reconciled against routing.
// Purpose: Keep at most one live handle per broker, bound to its latest topic.
// Dependencies: decouple-core, tracing
// ============================================================================

//! ## Overview
//! [`TopicCache`] maps each [`BrokerIdentity`] to the handle opened for the
//! topic its route named when the handle was created. Every lookup consults
//! the routing table first; a changed topic triggers a swap under the write
//! lock with double-checking so concurrent callers open the new topic once.
//! Invariants:
//! - At most one entry per broker.
//! - An entry's bound topic equals the topic its handle was opened against.
//! - A replaced or removed handle is closed exactly once, after it is no
//!   longer reachable from the map. Publishes that already hold it may finish.
//! - The map lock is never held across an `.await`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;

use decouple_core::BrokerIdentity;
use decouple_core::BrokerRoute;
use decouple_core::RoutingTable;
use decouple_core::TopicHandle;
use decouple_core::TopicHandleFactory;
use decouple_core::TopicId;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::error::DecoupleError;

// ============================================================================
// SECTION: Route Classification
// ============================================================================

/// Classifies a broker route and returns its validated topic.
///
/// # Errors
///
/// Returns [`DecoupleError::NotFound`] when `route` is absent,
/// [`DecoupleError::NotReady`] when the broker is not provisioned, and
/// [`DecoupleError::Incomplete`] when the topic id is empty or malformed.
pub fn classify_route(
    broker: &BrokerIdentity,
    route: Option<BrokerRoute>,
) -> Result<TopicId, DecoupleError> {
    let Some(route) = route else {
        debug!(broker = %broker, "broker not found in routing table");
        return Err(DecoupleError::NotFound(broker.clone()));
    };
    if !route.is_ready() {
        debug!(broker = %broker, "broker not ready");
        return Err(DecoupleError::NotReady(broker.clone()));
    }
    TopicId::parse(&route.topic_id).map_err(|err| {
        error!(
            broker = %broker,
            topic_id = %route.topic_id,
            error = %err,
            "broker route is ready but its decouple topic is unusable"
        );
        DecoupleError::Incomplete {
            broker: broker.clone(),
            reason: err.to_string(),
        }
    })
}

// ============================================================================
// SECTION: Cache Entries
// ============================================================================

/// Cached handle plus the topic it was opened against.
struct CacheEntry {
    /// Open handle owned by this entry.
    handle: Arc<dyn TopicHandle>,
    /// Topic the handle was opened against.
    bound_topic: TopicId,
}

// ============================================================================
// SECTION: Topic Cache
// ============================================================================

/// Broker to topic handle cache.
///
/// # Invariants
/// - Handles are opened only for routes classified as ready and complete.
/// - Factory failures leave existing entries untouched.
pub struct TopicCache {
    /// Routing view consulted on every lookup.
    routing: Arc<dyn RoutingTable>,
    /// Factory used to open handles on a miss or rotation.
    factory: Arc<dyn TopicHandleFactory>,
    /// Cached entries keyed by broker.
    entries: RwLock<HashMap<BrokerIdentity, CacheEntry>>,
}

impl TopicCache {
    /// Creates an empty cache over the provided collaborators.
    #[must_use]
    pub fn new(routing: Arc<dyn RoutingTable>, factory: Arc<dyn TopicHandleFactory>) -> Self {
        Self {
            routing,
            factory,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the handle for `broker`, opening or rotating it when the
    /// cached topic no longer matches the route.
    ///
    /// # Errors
    ///
    /// Returns [`DecoupleError`] for routing classification failures, factory
    /// failures ([`DecoupleError::HandleOpen`]), or a poisoned lock.
    pub fn get_or_create(
        &self,
        broker: &BrokerIdentity,
    ) -> Result<Arc<dyn TopicHandle>, DecoupleError> {
        let topic = self.resolve(broker)?;
        {
            let entries = self.entries.read().map_err(|_| lock_poisoned("read"))?;
            if let Some(entry) = entries.get(broker)
                && entry.bound_topic == topic
            {
                return Ok(Arc::clone(&entry.handle));
            }
        }

        let mut entries = self.entries.write().map_err(|_| lock_poisoned("write"))?;
        let topic = self.resolve(broker)?;
        if let Some(entry) = entries.get(broker)
            && entry.bound_topic == topic
        {
            return Ok(Arc::clone(&entry.handle));
        }
        debug!(broker = %broker, topic = %topic, "topic cache miss");
        let handle = self.factory.open(&topic)?;
        let previous = entries.insert(
            broker.clone(),
            CacheEntry {
                handle: Arc::clone(&handle),
                bound_topic: topic.clone(),
            },
        );
        drop(entries);

        match previous {
            Some(previous) => {
                info!(
                    broker = %broker,
                    previous_topic = %previous.bound_topic,
                    topic = %topic,
                    "rotated decouple topic"
                );
                previous.handle.close();
            }
            None => info!(broker = %broker, topic = %topic, "opened decouple topic"),
        }
        Ok(handle)
    }

    /// Returns the number of cached brokers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Returns the topic currently bound for `broker`.
    #[must_use]
    pub fn bound_topic(&self, broker: &BrokerIdentity) -> Option<TopicId> {
        self.read_entries().get(broker).map(|entry| entry.bound_topic.clone())
    }

    /// Removes and closes entries whose broker is absent from the routing
    /// table. Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`DecoupleError::Internal`] when the cache lock is poisoned.
    pub fn prune_absent(&self) -> Result<usize, DecoupleError> {
        let mut entries = self.entries.write().map_err(|_| lock_poisoned("write"))?;
        let absent: Vec<BrokerIdentity> = entries
            .keys()
            .filter(|broker| self.routing.lookup(broker).is_none())
            .cloned()
            .collect();
        let removed: Vec<(BrokerIdentity, CacheEntry)> = absent
            .into_iter()
            .filter_map(|broker| entries.remove(&broker).map(|entry| (broker, entry)))
            .collect();
        drop(entries);

        for (broker, entry) in &removed {
            info!(broker = %broker, topic = %entry.bound_topic, "pruned decouple topic");
            entry.handle.close();
        }
        Ok(removed.len())
    }

    /// Removes and closes every cached handle. Returns the number closed.
    ///
    /// # Errors
    ///
    /// Returns [`DecoupleError::Internal`] when the cache lock is poisoned.
    pub fn close_all(&self) -> Result<usize, DecoupleError> {
        let mut entries = self.entries.write().map_err(|_| lock_poisoned("write"))?;
        let drained: Vec<CacheEntry> = entries.drain().map(|(_, entry)| entry).collect();
        drop(entries);

        for entry in &drained {
            entry.handle.close();
        }
        Ok(drained.len())
    }

    /// Looks up and classifies the current route for `broker`.
    fn resolve(&self, broker: &BrokerIdentity) -> Result<TopicId, DecoupleError> {
        classify_route(broker, self.routing.lookup(broker))
    }

    /// Read guard for diagnostics; the map stays consistent under poisoning.
    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<BrokerIdentity, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Logs and builds the error for a poisoned cache lock.
fn lock_poisoned(mode: &str) -> DecoupleError {
    error!(mode, "topic cache lock poisoned");
    DecoupleError::Internal(format!("topic cache {mode} lock poisoned"))
}
