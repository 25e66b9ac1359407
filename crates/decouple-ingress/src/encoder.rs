// crates/decouple-ingress/src/encoder.rs
// ============================================================================
// Module: Binary Event Encoder
// Description: CloudEvents binary content mode for attribute-based transports.
// Purpose: Map events and trace context onto message attributes and body.
// Dependencies: decouple-core, bytes
// ============================================================================

//! ## Overview
//! [`BinaryEventEncoder`] places each CloudEvents attribute in a `ce-` prefixed
//! message attribute and the event data in the message body. The content type
//! travels as `Content-Type`. A supplied [`TraceContext`] sets
//! `ce-traceparent` and `ce-tracestate`, replacing event extensions of the
//! same name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use bytes::Bytes;
use decouple_core::EncodeError;
use decouple_core::Event;
use decouple_core::EventData;
use decouple_core::EventEncoder;
use decouple_core::Message;
use decouple_core::TraceContext;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix applied to CloudEvents attribute names.
pub const ATTRIBUTE_PREFIX: &str = "ce-";
/// Attribute carrying the data content type.
pub const CONTENT_TYPE_ATTRIBUTE: &str = "Content-Type";
/// Distributed tracing parent extension name.
const TRACEPARENT: &str = "traceparent";
/// Tracing vendor state extension name.
const TRACESTATE: &str = "tracestate";

// ============================================================================
// SECTION: Encoder
// ============================================================================

/// CloudEvents binary content mode encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryEventEncoder;

impl EventEncoder for BinaryEventEncoder {
    fn encode(&self, event: &Event, trace: Option<&TraceContext>) -> Result<Message, EncodeError> {
        event.validate().map_err(|err| EncodeError::InvalidEvent(err.to_string()))?;

        let mut attributes = BTreeMap::new();
        let mut put = |name: &str, value: String| {
            attributes.insert(format!("{ATTRIBUTE_PREFIX}{name}"), value);
        };
        put("specversion", event.spec_version.clone());
        put("id", event.id.clone());
        put("source", event.source.clone());
        put("type", event.event_type.clone());
        if let Some(subject) = &event.subject {
            put("subject", subject.clone());
        }
        if let Some(time) =
            event.time_rfc3339().map_err(|err| EncodeError::InvalidEvent(err.to_string()))?
        {
            put("time", time);
        }
        if let Some(schema) = &event.data_schema {
            put("dataschema", schema.clone());
        }
        for (name, value) in &event.extensions {
            if trace.is_some() && (name == TRACEPARENT || name == TRACESTATE) {
                continue;
            }
            put(name, value.clone());
        }
        if let Some(trace) = trace {
            put(TRACEPARENT, trace.traceparent());
            if let Some(state) = &trace.tracestate {
                put(TRACESTATE, state.clone());
            }
        }
        if let Some(content_type) = &event.data_content_type {
            attributes.insert(CONTENT_TYPE_ATTRIBUTE.to_string(), content_type.clone());
        }

        let data = event
            .data
            .as_ref()
            .map(EventData::to_bytes)
            .transpose()
            .map_err(|err| EncodeError::Serialization(err.to_string()))?
            .unwrap_or_default();
        Ok(Message {
            data: Bytes::from(data),
            attributes,
        })
    }
}
