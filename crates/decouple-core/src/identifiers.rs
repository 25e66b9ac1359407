// crates/decouple-core/src/identifiers.rs
// ============================================================================
// Module: Decouple Identifiers
// Description: Broker identities and validated topic identifiers.
// Purpose: Provide strongly typed keys for the routing and cache layers.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`BrokerIdentity`] is the structural `(namespace, name)` pair used as the
//! topic cache key. [`TopicId`] is a validated decouple topic identifier in
//! either short (`my-topic`) or fully qualified
//! (`projects/my-project/topics/my-topic`) form.
//! Invariants:
//! - A [`TopicId`] always satisfies the topic naming rules enforced by
//!   [`TopicId::parse`].
//! - Broker identities compare and hash structurally.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum topic name length in characters.
pub const MIN_TOPIC_NAME_LEN: usize = 3;
/// Maximum topic name length in characters.
pub const MAX_TOPIC_NAME_LEN: usize = 255;
/// Prefix reserved by the messaging provider.
const RESERVED_TOPIC_PREFIX: &str = "goog";
/// Punctuation permitted in topic names in addition to ASCII alphanumerics.
const TOPIC_NAME_PUNCTUATION: &str = "-_.~+%";
/// Leading segment of a fully qualified topic resource name.
const PROJECTS_SEGMENT: &str = "projects/";
/// Middle segment of a fully qualified topic resource name.
const TOPICS_SEGMENT: &str = "topics/";

// ============================================================================
// SECTION: Broker Identity
// ============================================================================

/// Errors raised when parsing a broker identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Input was not of the form `namespace/name`.
    #[error("malformed broker identity {0:?}: expected namespace/name")]
    Malformed(String),
}

/// Identity of a logical broker: a `(namespace, name)` pair.
///
/// # Invariants
/// - Equality and hashing are structural over both components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BrokerIdentity {
    /// Namespace containing the broker.
    namespace: String,
    /// Broker name within the namespace.
    name: String,
}

impl BrokerIdentity {
    /// Creates a broker identity.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parses an identity from its `namespace/name` display form.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Malformed`] when either component is empty or
    /// the input does not contain exactly one `/`.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let Some((namespace, name)) = raw.split_once('/') else {
            return Err(IdentityError::Malformed(raw.to_string()));
        };
        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(IdentityError::Malformed(raw.to_string()));
        }
        Ok(Self::new(namespace, name))
    }

    /// Returns the broker namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the broker name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BrokerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for BrokerIdentity {
    type Err = IdentityError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

// ============================================================================
// SECTION: Topic Identifier
// ============================================================================

/// Errors raised when validating a topic identifier.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicIdError {
    /// Topic identifier was empty.
    #[error("topic id is empty")]
    Empty,
    /// Topic name length is outside the permitted range.
    #[error("topic name length {0} outside {min}..={max}", min = MIN_TOPIC_NAME_LEN, max = MAX_TOPIC_NAME_LEN)]
    Length(usize),
    /// Topic name does not start with an ASCII letter.
    #[error("topic name must start with a letter")]
    InvalidStart,
    /// Topic name uses the provider-reserved prefix.
    #[error("topic name must not start with \"goog\"")]
    Reserved,
    /// Topic name contains a character outside the permitted set.
    #[error("topic name contains invalid character {0:?}")]
    InvalidCharacter(char),
    /// Project segment of a qualified name is invalid.
    #[error("invalid project id {0:?}")]
    InvalidProject(String),
    /// Qualified resource name does not follow `projects/{p}/topics/{t}`.
    #[error("malformed topic resource name {0:?}")]
    Malformed(String),
}

/// Validated decouple topic identifier.
///
/// # Invariants
/// - The wrapped string is either a valid topic name or a valid
///   `projects/{project}/topics/{topic}` resource name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TopicId(String);

impl TopicId {
    /// Parses and validates a topic identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TopicIdError`] when the identifier violates topic naming rules.
    pub fn parse(raw: &str) -> Result<Self, TopicIdError> {
        if raw.is_empty() {
            return Err(TopicIdError::Empty);
        }
        if let Some(rest) = raw.strip_prefix(PROJECTS_SEGMENT) {
            let (project, tail) =
                rest.split_once('/').ok_or_else(|| TopicIdError::Malformed(raw.to_string()))?;
            let topic = tail
                .strip_prefix(TOPICS_SEGMENT)
                .ok_or_else(|| TopicIdError::Malformed(raw.to_string()))?;
            validate_project(project)?;
            validate_topic_name(topic)?;
        } else if raw.contains('/') {
            return Err(TopicIdError::Malformed(raw.to_string()));
        } else {
            validate_topic_name(raw)?;
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the identifier as provided.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the project when the identifier is fully qualified.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.0
            .strip_prefix(PROJECTS_SEGMENT)
            .and_then(|rest| rest.split_once('/'))
            .map(|(project, _)| project)
    }

    /// Returns the bare topic name.
    #[must_use]
    pub fn topic_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns true when the identifier carries its project.
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.project().is_some()
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for TopicId {
    type Error = TopicIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TopicId> for String {
    fn from(value: TopicId) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Validates a bare topic name.
fn validate_topic_name(name: &str) -> Result<(), TopicIdError> {
    let len = name.chars().count();
    if !(MIN_TOPIC_NAME_LEN..=MAX_TOPIC_NAME_LEN).contains(&len) {
        return Err(TopicIdError::Length(len));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(TopicIdError::InvalidStart);
    }
    if name.starts_with(RESERVED_TOPIC_PREFIX) {
        return Err(TopicIdError::Reserved);
    }
    if let Some(invalid) =
        name.chars().find(|c| !(c.is_ascii_alphanumeric() || TOPIC_NAME_PUNCTUATION.contains(*c)))
    {
        return Err(TopicIdError::InvalidCharacter(invalid));
    }
    Ok(())
}

/// Validates the project segment of a qualified topic name.
fn validate_project(project: &str) -> Result<(), TopicIdError> {
    let valid = !project.is_empty()
        && project
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | ':'));
    if valid { Ok(()) } else { Err(TopicIdError::InvalidProject(project.to_string())) }
}
