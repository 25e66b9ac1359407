// crates/decouple-ingress/tests/binary_encoder.rs
// ============================================================================
// Module: Binary Encoder Tests
// Description: Attribute mapping tests for the binary-mode encoder.
// Purpose: Ensure events and trace context land in the right attributes.
// Dependencies: decouple-core, decouple-ingress, serde_json, time
// ============================================================================

//! ## Overview
//! Exercises [`decouple_ingress::BinaryEventEncoder`].

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use decouple_core::EncodeError;
use decouple_core::Event;
use decouple_core::EventData;
use decouple_core::EventEncoder;
use decouple_core::TraceContext;
use decouple_ingress::BinaryEventEncoder;
use serde_json::json;

/// Reference traceparent.
const TRACEPARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

/// Tests context attributes map to `ce-` attributes.
#[test]
fn encodes_context_attributes() {
    let event = Event::new("evt-1", "//src", "com.example.created")
        .with_subject("orders/1")
        .with_data("application/json", EventData::Json(json!({"a": 1})))
        .with_extension("partitionkey", "orders");

    let message = BinaryEventEncoder.encode(&event, None).unwrap();
    let attr = |name: &str| message.attributes.get(name).cloned();

    assert_eq!(attr("ce-specversion").as_deref(), Some("1.0"));
    assert_eq!(attr("ce-id").as_deref(), Some("evt-1"));
    assert_eq!(attr("ce-source").as_deref(), Some("//src"));
    assert_eq!(attr("ce-type").as_deref(), Some("com.example.created"));
    assert_eq!(attr("ce-subject").as_deref(), Some("orders/1"));
    assert_eq!(attr("ce-partitionkey").as_deref(), Some("orders"));
    assert_eq!(attr("Content-Type").as_deref(), Some("application/json"));
    assert_eq!(attr("ce-time"), None);
    assert_eq!(attr("ce-traceparent"), None);
    assert_eq!(message.data.as_ref(), br#"{"a":1}"#);
}

/// Tests binary data is carried verbatim.
#[test]
fn encodes_binary_body_verbatim() {
    let event = Event::new("evt-2", "src", "bin")
        .with_data("application/octet-stream", EventData::Bytes(vec![0, 159, 255]));
    let message = BinaryEventEncoder.encode(&event, None).unwrap();
    assert_eq!(message.data.as_ref(), &[0_u8, 159, 255]);
}

/// Tests a supplied trace context replaces event tracing extensions.
#[test]
fn trace_context_overrides_extensions() {
    let event = Event::new("evt-3", "src", "t")
        .with_extension("traceparent", "00-11111111111111111111111111111111-2222222222222222-00")
        .with_extension("tracestate", "stale=1");
    let trace = TraceContext::parse_traceparent(TRACEPARENT).unwrap().with_tracestate("vendor=1");

    let message = BinaryEventEncoder.encode(&event, Some(&trace)).unwrap();

    assert_eq!(message.attributes.get("ce-traceparent").map(String::as_str), Some(TRACEPARENT));
    assert_eq!(message.attributes.get("ce-tracestate").map(String::as_str), Some("vendor=1"));
}

/// Tests event tracing extensions survive when no trace context is supplied.
#[test]
fn event_trace_extension_kept_without_context() {
    let event = Event::new("evt-4", "src", "t").with_extension("traceparent", TRACEPARENT);
    let message = BinaryEventEncoder.encode(&event, None).unwrap();
    assert_eq!(message.attributes.get("ce-traceparent").map(String::as_str), Some(TRACEPARENT));
}

/// Tests invalid events are rejected.
#[test]
fn rejects_invalid_events() {
    let event = Event::new("evt-5", "", "t");
    let err = BinaryEventEncoder.encode(&event, None).unwrap_err();
    assert!(matches!(err, EncodeError::InvalidEvent(_)));
}
