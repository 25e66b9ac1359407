// crates/decouple-ingress/src/routing/mod.rs
// ============================================================================
// Module: Decouple Routing Tables
// Description: Reference routing table implementations.
// Purpose: Supply broker routes from memory or from a control-plane file.
// Dependencies: decouple-core
// ============================================================================

//! ## Overview
//! Routing tables implement [`decouple_core::RoutingTable`]. The in-memory
//! table is mutated by its owner; the file table mirrors the JSON routing
//! document written by the control plane.

pub mod file;
pub mod memory;

pub use file::FileRoutingTable;
pub use file::MIN_REFRESH_INTERVAL;
pub use file::RoutingLoadError;
pub use file::RoutingSnapshot;
pub use memory::InMemoryRoutingTable;
