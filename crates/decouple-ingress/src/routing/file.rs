// crates/decouple-ingress/src/routing/file.rs
// ============================================================================
// Module: File Routing Table
// Description: Routing table backed by the control plane's JSON document.
// Purpose: Mirror the mounted routing file and refresh it periodically.
// Dependencies: decouple-core, serde, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! The control plane mounts a JSON routing document listing every broker per
//! namespace together with its state and decouple queue. [`RoutingSnapshot`]
//! is one parsed copy of that document; [`FileRoutingTable`] holds the latest
//! snapshot and swaps it atomically on [`FileRoutingTable::reload`].
//! Invariants:
//! - A failed reload keeps the previous snapshot.
//! - Files larger than the configured cap are rejected before parsing.
//! - A broker without a decouple queue topic maps to an empty topic id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::Weak;
use std::time::Duration;

use decouple_core::BrokerIdentity;
use decouple_core::BrokerRoute;
use decouple_core::RouteState;
use decouple_core::RoutingTable;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Shortest refresh period; shorter requests are raised to it.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading a routing document.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingLoadError {
    /// File could not be read.
    #[error("routing file io error: {0}")]
    Io(String),
    /// File exceeds the size cap.
    #[error("routing file is {size} bytes, exceeding the {max} byte limit")]
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Configured cap in bytes.
        max: u64,
    },
    /// Document is not valid routing JSON.
    #[error("routing file parse error: {0}")]
    Parse(String),
}

// ============================================================================
// SECTION: Routing Document
// ============================================================================

/// Decouple queue assigned to a broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoupleQueue {
    /// Topic events are published to.
    #[serde(default)]
    pub topic: String,
    /// Subscription the fanout stage pulls from.
    #[serde(default)]
    pub subscription: String,
}

/// Routing entry for one broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerTarget {
    /// Provisioning state.
    #[serde(default)]
    pub state: RouteState,
    /// Decouple queue, absent until provisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decouple_queue: Option<DecoupleQueue>,
}

impl BrokerTarget {
    /// Converts the entry into a route snapshot.
    #[must_use]
    pub fn route(&self) -> BrokerRoute {
        BrokerRoute {
            state: self.state,
            topic_id: self.decouple_queue.as_ref().map(|queue| queue.topic.clone()).unwrap_or_default(),
        }
    }
}

/// Brokers declared in one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceTargets {
    /// Brokers keyed by name.
    #[serde(default)]
    pub brokers: BTreeMap<String, BrokerTarget>,
}

/// Parsed routing document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingSnapshot {
    /// Namespaces keyed by name.
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceTargets>,
}

impl RoutingSnapshot {
    /// Parses a routing document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingLoadError::Parse`] when the bytes are not a routing document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, RoutingLoadError> {
        serde_json::from_slice(bytes).map_err(|err| RoutingLoadError::Parse(err.to_string()))
    }

    /// Reads and parses a routing document, rejecting files over `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingLoadError`] when the file is unreadable, too large, or invalid.
    pub fn load(path: &Path, max_bytes: u64) -> Result<Self, RoutingLoadError> {
        let size = fs::metadata(path).map_err(|err| RoutingLoadError::Io(err.to_string()))?.len();
        if size > max_bytes {
            return Err(RoutingLoadError::TooLarge {
                size,
                max: max_bytes,
            });
        }
        let bytes = fs::read(path).map_err(|err| RoutingLoadError::Io(err.to_string()))?;
        let read = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if read > max_bytes {
            return Err(RoutingLoadError::TooLarge {
                size: read,
                max: max_bytes,
            });
        }
        Self::from_json(&bytes)
    }

    /// Iterates every broker with its route.
    pub fn routes(&self) -> impl Iterator<Item = (BrokerIdentity, BrokerRoute)> + '_ {
        self.namespaces.iter().flat_map(|(namespace, targets)| {
            targets
                .brokers
                .iter()
                .map(move |(name, target)| (BrokerIdentity::new(namespace, name), target.route()))
        })
    }

    /// Returns the number of brokers in the document.
    #[must_use]
    pub fn broker_count(&self) -> usize {
        self.namespaces.values().map(|targets| targets.brokers.len()).sum()
    }
}

impl RoutingTable for RoutingSnapshot {
    fn lookup(&self, broker: &BrokerIdentity) -> Option<BrokerRoute> {
        self.namespaces
            .get(broker.namespace())
            .and_then(|targets| targets.brokers.get(broker.name()))
            .map(BrokerTarget::route)
    }
}

// ============================================================================
// SECTION: File Routing Table
// ============================================================================

/// Routing table mirroring a routing document on disk.
#[derive(Debug)]
pub struct FileRoutingTable {
    /// Routing document path.
    path: PathBuf,
    /// Size cap applied to every load.
    max_bytes: u64,
    /// Latest successfully loaded snapshot.
    snapshot: RwLock<Arc<RoutingSnapshot>>,
}

impl FileRoutingTable {
    /// Loads the routing document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingLoadError`] when the initial load fails.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64) -> Result<Self, RoutingLoadError> {
        let path = path.into();
        let snapshot = RoutingSnapshot::load(&path, max_bytes)?;
        Ok(Self {
            path,
            max_bytes,
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Returns the routing document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RoutingSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Reloads the document and swaps in the new snapshot. Returns the number
    /// of brokers loaded.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingLoadError`] when loading fails; the previous snapshot
    /// stays in effect.
    pub fn reload(&self) -> Result<usize, RoutingLoadError> {
        let next = RoutingSnapshot::load(&self.path, self.max_bytes)?;
        let brokers = next.broker_count();
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        debug!(path = %self.path.display(), brokers, "routing file reloaded");
        Ok(brokers)
    }

    /// Spawns a task that reloads the document every `interval`, raised to
    /// at least [`MIN_REFRESH_INTERVAL`]. The task exits once the table is
    /// dropped.
    #[must_use]
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let table: Weak<Self> = Arc::downgrade(self);
        let interval = interval.max(MIN_REFRESH_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(table) = table.upgrade() else {
                    break;
                };
                let path = table.path.clone();
                match tokio::task::spawn_blocking(move || table.reload()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => {
                        warn!(path = %path.display(), error = %err, "routing refresh failed; keeping previous snapshot");
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "routing refresh task failed");
                    }
                }
            }
        })
    }
}

impl RoutingTable for FileRoutingTable {
    fn lookup(&self, broker: &BrokerIdentity) -> Option<BrokerRoute> {
        self.snapshot().lookup(broker)
    }
}
