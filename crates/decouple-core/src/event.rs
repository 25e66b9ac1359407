// crates/decouple-core/src/event.rs
// ============================================================================
// Module: Decouple Events
// Description: CloudEvents 1.0 event model with structured JSON support.
// Purpose: Carry ingress events from receivers to encoders.
// Dependencies: base64, serde, serde_json, time, thiserror
// ============================================================================

//! ## Overview
//! [`Event`] holds the CloudEvents context attributes, extension attributes,
//! and an optional [`EventData`] body. It serializes to and from the
//! CloudEvents structured JSON format, using `data` for JSON bodies and
//! `data_base64` for binary bodies.
//! Invariants:
//! - [`Event::validate`] must pass before an event is encoded for transport.
//! - Extension attribute values are carried as strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// The only CloudEvents spec version accepted.
pub const SPEC_VERSION: &str = "1.0";
/// Maximum extension attribute name length.
pub const MAX_EXTENSION_NAME_LEN: usize = 20;
/// Attribute names that extensions may not shadow.
const RESERVED_ATTRIBUTES: [&str; 10] = [
    "id",
    "source",
    "specversion",
    "type",
    "subject",
    "time",
    "datacontenttype",
    "dataschema",
    "data",
    "data_base64",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by event parsing and validation.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// A required context attribute is empty.
    #[error("event attribute {0} is required")]
    MissingAttribute(&'static str),
    /// Spec version is not supported.
    #[error("unsupported specversion {0:?}")]
    UnsupportedSpecVersion(String),
    /// Extension name violates naming rules.
    #[error("invalid extension attribute name {0:?}")]
    InvalidExtensionName(String),
    /// Extension value is not a string, number, or boolean.
    #[error("extension attribute {0:?} must be a scalar")]
    InvalidExtensionValue(String),
    /// Timestamp could not be parsed or rendered as RFC 3339.
    #[error("invalid event time: {0}")]
    InvalidTime(String),
    /// Both `data` and `data_base64` were supplied, or base64 was invalid.
    #[error("invalid event data: {0}")]
    InvalidData(String),
    /// Event data could not be serialized.
    #[error("event data serialization failed: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Event body.
///
/// # Invariants
/// - [`EventData::Json`] is used only for JSON content types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    /// JSON body.
    Json(Value),
    /// Raw body bytes.
    Bytes(Vec<u8>),
}

impl EventData {
    /// Serializes the body into wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Serialization`] when a JSON body cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EventError> {
        match self {
            Self::Json(value) => {
                serde_json::to_vec(value).map_err(|err| EventError::Serialization(err.to_string()))
            }
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// CloudEvents 1.0 event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StructuredEvent", into = "StructuredEvent")]
pub struct Event {
    /// Event identifier, unique per source.
    pub id: String,
    /// Event source URI-reference.
    pub source: String,
    /// CloudEvents spec version.
    pub spec_version: String,
    /// Event type.
    pub event_type: String,
    /// Optional subject within the source.
    pub subject: Option<String>,
    /// Optional occurrence time.
    pub time: Option<OffsetDateTime>,
    /// Optional content type of `data`.
    pub data_content_type: Option<String>,
    /// Optional schema URI for `data`.
    pub data_schema: Option<String>,
    /// Extension attributes keyed by name.
    pub extensions: BTreeMap<String, String>,
    /// Optional event body.
    pub data: Option<EventData>,
}

impl Event {
    /// Creates an event with the required context attributes.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            spec_version: SPEC_VERSION.to_string(),
            event_type: event_type.into(),
            subject: None,
            time: None,
            data_content_type: None,
            data_schema: None,
            extensions: BTreeMap::new(),
            data: None,
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the occurrence time.
    #[must_use]
    pub const fn with_time(mut self, time: OffsetDateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Sets the body and its content type.
    #[must_use]
    pub fn with_data(mut self, content_type: impl Into<String>, data: EventData) -> Self {
        self.data_content_type = Some(content_type.into());
        self.data = Some(data);
        self
    }

    /// Adds an extension attribute.
    #[must_use]
    pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.insert(name.into(), value.into());
        self
    }

    /// Returns the occurrence time rendered as RFC 3339.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidTime`] when the time cannot be rendered.
    pub fn time_rfc3339(&self) -> Result<Option<String>, EventError> {
        self.time
            .map(|time| time.format(&Rfc3339).map_err(|err| EventError::InvalidTime(err.to_string())))
            .transpose()
    }

    /// Validates required attributes and extension names.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] describing the first violation found.
    pub fn validate(&self) -> Result<(), EventError> {
        if self.id.is_empty() {
            return Err(EventError::MissingAttribute("id"));
        }
        if self.source.is_empty() {
            return Err(EventError::MissingAttribute("source"));
        }
        if self.event_type.is_empty() {
            return Err(EventError::MissingAttribute("type"));
        }
        if self.spec_version != SPEC_VERSION {
            return Err(EventError::UnsupportedSpecVersion(self.spec_version.clone()));
        }
        for name in self.extensions.keys() {
            validate_extension_name(name)?;
        }
        self.time_rfc3339()?;
        Ok(())
    }
}

/// Returns true when the content type denotes JSON.
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    let base = content_type.split(';').next().unwrap_or(content_type).trim().to_ascii_lowercase();
    base == "application/json" || base == "text/json" || base.ends_with("+json")
}

/// Validates an extension attribute name.
fn validate_extension_name(name: &str) -> Result<(), EventError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_EXTENSION_NAME_LEN
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && !RESERVED_ATTRIBUTES.contains(&name);
    if valid { Ok(()) } else { Err(EventError::InvalidExtensionName(name.to_string())) }
}

// ============================================================================
// SECTION: Structured JSON Format
// ============================================================================

/// CloudEvents structured-mode JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StructuredEvent {
    /// Spec version attribute.
    specversion: String,
    /// Event identifier.
    id: String,
    /// Event source.
    source: String,
    /// Event type.
    #[serde(rename = "type")]
    event_type: String,
    /// Optional subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    /// Optional RFC 3339 time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    /// Optional data content type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datacontenttype: Option<String>,
    /// Optional data schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dataschema: Option<String>,
    /// JSON or string body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    /// Base64 binary body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_base64: Option<String>,
    /// Remaining members are extension attributes.
    #[serde(flatten)]
    extensions: BTreeMap<String, Value>,
}

impl TryFrom<StructuredEvent> for Event {
    type Error = EventError;

    fn try_from(doc: StructuredEvent) -> Result<Self, Self::Error> {
        let time = doc
            .time
            .map(|raw| {
                OffsetDateTime::parse(&raw, &Rfc3339)
                    .map_err(|err| EventError::InvalidTime(err.to_string()))
            })
            .transpose()?;
        let data = match (doc.data, doc.data_base64) {
            (Some(_), Some(_)) => {
                return Err(EventError::InvalidData(
                    "data and data_base64 are mutually exclusive".to_string(),
                ));
            }
            (None, Some(encoded)) => Some(EventData::Bytes(
                STANDARD.decode(encoded).map_err(|err| EventError::InvalidData(err.to_string()))?,
            )),
            (Some(Value::String(text)), None)
                if doc.datacontenttype.as_deref().is_some_and(|ct| !is_json_content_type(ct)) =>
            {
                Some(EventData::Bytes(text.into_bytes()))
            }
            (Some(value), None) => Some(EventData::Json(value)),
            (None, None) => None,
        };
        let mut extensions = BTreeMap::new();
        for (name, value) in doc.extensions {
            let value = match value {
                Value::String(text) => text,
                Value::Bool(flag) => flag.to_string(),
                Value::Number(number) => number.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(EventError::InvalidExtensionValue(name));
                }
            };
            extensions.insert(name, value);
        }
        Ok(Self {
            id: doc.id,
            source: doc.source,
            spec_version: doc.specversion,
            event_type: doc.event_type,
            subject: doc.subject,
            time,
            data_content_type: doc.datacontenttype,
            data_schema: doc.dataschema,
            extensions,
            data,
        })
    }
}

impl From<Event> for StructuredEvent {
    fn from(event: Event) -> Self {
        let time = event.time_rfc3339().ok().flatten();
        let (data, data_base64) = match event.data {
            Some(EventData::Json(value)) => (Some(value), None),
            Some(EventData::Bytes(bytes)) => (None, Some(STANDARD.encode(bytes))),
            None => (None, None),
        };
        Self {
            specversion: event.spec_version,
            id: event.id,
            source: event.source,
            event_type: event.event_type,
            subject: event.subject,
            time,
            datacontenttype: event.data_content_type,
            dataschema: event.data_schema,
            data,
            data_base64,
            extensions: event
                .extensions
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect(),
        }
    }
}
