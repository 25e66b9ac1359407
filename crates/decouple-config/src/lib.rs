// crates/decouple-config/src/lib.rs
// ============================================================================
// Module: Decouple Config Library
// Description: Canonical config model and validation for the ingress.
// Purpose: Single source of truth for decouple-ingress.toml semantics.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! `decouple-config` defines the configuration model for the decouple
//! ingress binary: logging, the routing document, publish limits, and the
//! downstream transport. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod logging;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use logging::LogConfig;
pub use logging::LogFormat;
pub use logging::LogLevel;
