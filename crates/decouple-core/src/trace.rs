// crates/decouple-core/src/trace.rs
// ============================================================================
// Module: Decouple Trace Context
// Description: W3C trace context carried alongside published events.
// Purpose: Propagate distributed tracing identifiers into event metadata.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`TraceContext`] models the W3C `traceparent` header (version `00`) plus an
//! optional opaque `tracestate`. Encoders attach it to outgoing messages as
//! the CloudEvents distributed tracing extension.
//! Invariants:
//! - Trace and span identifiers are never all zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Supported `traceparent` version.
const TRACEPARENT_VERSION: &str = "00";
/// Flag bit signalling a sampled trace.
const FLAG_SAMPLED: u8 = 0x01;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while parsing a `traceparent` value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceContextError {
    /// Value did not have four dash-separated fields of the right width.
    #[error("malformed traceparent: {0}")]
    Malformed(String),
    /// Version field is not supported.
    #[error("unsupported traceparent version {0:?}")]
    UnsupportedVersion(String),
    /// Trace or span id was all zeros.
    #[error("traceparent carries an all-zero {0}")]
    ZeroId(&'static str),
}

// ============================================================================
// SECTION: Trace Context
// ============================================================================

/// W3C trace context for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// 16-byte trace identifier.
    pub trace_id: [u8; 16],
    /// 8-byte parent span identifier.
    pub span_id: [u8; 8],
    /// Whether the trace is sampled.
    pub sampled: bool,
    /// Optional vendor-specific `tracestate` value.
    pub tracestate: Option<String>,
}

impl TraceContext {
    /// Creates a trace context.
    ///
    /// # Errors
    ///
    /// Returns [`TraceContextError::ZeroId`] when either identifier is all zeros.
    pub fn new(
        trace_id: [u8; 16],
        span_id: [u8; 8],
        sampled: bool,
    ) -> Result<Self, TraceContextError> {
        if trace_id.iter().all(|byte| *byte == 0) {
            return Err(TraceContextError::ZeroId("trace id"));
        }
        if span_id.iter().all(|byte| *byte == 0) {
            return Err(TraceContextError::ZeroId("span id"));
        }
        Ok(Self {
            trace_id,
            span_id,
            sampled,
            tracestate: None,
        })
    }

    /// Attaches a `tracestate` value.
    #[must_use]
    pub fn with_tracestate(mut self, tracestate: impl Into<String>) -> Self {
        self.tracestate = Some(tracestate.into());
        self
    }

    /// Parses a `traceparent` header value.
    ///
    /// # Errors
    ///
    /// Returns [`TraceContextError`] when the value is malformed, uses an
    /// unsupported version, or carries an all-zero identifier.
    pub fn parse_traceparent(value: &str) -> Result<Self, TraceContextError> {
        let fields: Vec<&str> = value.trim().split('-').collect();
        let [version, trace, span, flags] = fields.as_slice() else {
            return Err(TraceContextError::Malformed(value.to_string()));
        };
        if version.len() != 2 {
            return Err(TraceContextError::Malformed(value.to_string()));
        }
        if *version != TRACEPARENT_VERSION {
            return Err(TraceContextError::UnsupportedVersion((*version).to_string()));
        }
        let trace_id: [u8; 16] = decode_hex(trace, value)?;
        let span_id: [u8; 8] = decode_hex(span, value)?;
        let [flag_byte]: [u8; 1] = decode_hex(flags, value)?;
        Self::new(trace_id, span_id, flag_byte & FLAG_SAMPLED != 0)
    }

    /// Renders the `traceparent` header value.
    #[must_use]
    pub fn traceparent(&self) -> String {
        let flags = if self.sampled { FLAG_SAMPLED } else { 0 };
        format!(
            "{TRACEPARENT_VERSION}-{}-{}-{}",
            encode_hex(&self.trace_id),
            encode_hex(&self.span_id),
            encode_hex(&[flags])
        )
    }
}

// ============================================================================
// SECTION: Hex Helpers
// ============================================================================

/// Lowercase hex encoding.
fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Decodes a fixed-width lowercase hex field.
fn decode_hex<const N: usize>(field: &str, original: &str) -> Result<[u8; N], TraceContextError> {
    let malformed = || TraceContextError::Malformed(original.to_string());
    if field.len() != N * 2 || !field.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(malformed());
    }
    let mut out = [0_u8; N];
    for (index, slot) in out.iter_mut().enumerate() {
        let pair = field.get(index * 2..index * 2 + 2).ok_or_else(malformed)?;
        *slot = u8::from_str_radix(pair, 16).map_err(|_| malformed())?;
    }
    Ok(out)
}
