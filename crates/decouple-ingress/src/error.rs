// crates/decouple-ingress/src/error.rs
// ============================================================================
// Module: Decouple Errors
// Description: Closed error taxonomy for the ingress path.
// Purpose: Let callers classify failures and decide on retries.
// Dependencies: decouple-core, thiserror
// ============================================================================

//! ## Overview
//! Every failure of [`crate::DecoupleSink::send`] and
//! [`crate::TopicCache::get_or_create`] is a [`DecoupleError`]. Collaborator
//! errors are carried unchanged so callers can inspect the original cause.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use decouple_core::BrokerIdentity;
use decouple_core::EncodeError;
use decouple_core::HandleOpenError;
use decouple_core::PublishError;
use thiserror::Error;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Coarse classification of a [`DecoupleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Broker is absent from the routing table.
    NotFound,
    /// Broker exists but is not provisioned.
    NotReady,
    /// Broker is ready but its topic id is empty or malformed.
    Incomplete,
    /// Topic handle factory failed.
    HandleOpen,
    /// Event could not be encoded.
    Encode,
    /// Transport failed to publish.
    Publish,
    /// Publish timed out.
    Cancelled,
    /// Internal invariant violation.
    Internal,
}

impl ErrorKind {
    /// Returns a stable label for logs and CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NotReady => "not_ready",
            Self::Incomplete => "incomplete",
            Self::HandleOpen => "handle_open",
            Self::Encode => "encode",
            Self::Publish => "publish",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Decouple Error
// ============================================================================

/// Errors returned by the ingress path.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Collaborator errors are wrapped without modification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoupleError {
    /// Broker is absent from the routing table.
    #[error("broker {0} not found in routing table")]
    NotFound(BrokerIdentity),
    /// Broker exists but is not ready.
    #[error("broker {0} is not ready")]
    NotReady(BrokerIdentity),
    /// Broker is ready but its decouple topic is unusable.
    #[error("broker {broker} has an incomplete route: {reason}")]
    Incomplete {
        /// Broker whose route is incomplete.
        broker: BrokerIdentity,
        /// Why the route is unusable.
        reason: String,
    },
    /// Topic handle could not be opened.
    #[error(transparent)]
    HandleOpen(#[from] HandleOpenError),
    /// Event could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Transport failed to publish.
    #[error(transparent)]
    Publish(#[from] PublishError),
    /// Publish did not complete within the timeout.
    #[error("publish cancelled after {timeout:?}")]
    Cancelled {
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DecoupleError {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotReady(_) => ErrorKind::NotReady,
            Self::Incomplete {
                ..
            } => ErrorKind::Incomplete,
            Self::HandleOpen(_) => ErrorKind::HandleOpen,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Publish(_) => ErrorKind::Publish,
            Self::Cancelled {
                ..
            } => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true when the caller may retry the same send later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound(_)
            | Self::NotReady(_)
            | Self::Cancelled {
                ..
            } => true,
            Self::HandleOpen(err) => err.is_retryable(),
            Self::Publish(err) => err.is_retryable(),
            Self::Incomplete {
                ..
            }
            | Self::Encode(_)
            | Self::Internal(_) => false,
        }
    }
}
