// crates/decouple-ingress/src/transport/pubsub.rs
// ============================================================================
// Module: Pub/Sub HTTP Transport
// Description: Google Cloud Pub/Sub publisher over the REST API.
// Purpose: Publish decouple messages to Pub/Sub topics.
// Dependencies: decouple-core, reqwest, base64, serde, url, tracing
// ============================================================================

//! ## Overview
//! [`PubSubHttpFactory`] opens handles that call
//! `POST {endpoint}/v1/projects/{project}/topics/{topic}:publish`. Opening a
//! handle only resolves the topic resource name; the HTTP connection is made
//! on the first publish. Short topic ids are qualified with the configured
//! project.
//! Invariants:
//! - A short topic id without a configured project cannot be opened.
//! - Non-success responses are returned as [`PublishError::Rejected`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use decouple_core::HandleOpenError;
use decouple_core::Message;
use decouple_core::PublishAck;
use decouple_core::PublishError;
use decouple_core::TopicHandle;
use decouple_core::TopicHandleFactory;
use decouple_core::TopicId;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::transport::CloseFlag;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Public Pub/Sub endpoint.
pub const DEFAULT_PUBSUB_ENDPOINT: &str = "https://pubsub.googleapis.com";
/// Maximum response body characters kept in rejection messages.
const MAX_ERROR_BODY_CHARS: usize = 512;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Settings for [`PubSubHttpFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubHttpConfig {
    /// Base endpoint URL.
    pub endpoint: String,
    /// Project used to qualify short topic ids.
    pub project_id: Option<String>,
    /// Bearer token sent with every request.
    pub auth_token: Option<String>,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
}

impl Default for PubSubHttpConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PUBSUB_ENDPOINT.to_string(),
            project_id: None,
            auth_token: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// SECTION: Wire Format
// ============================================================================

/// Publish request body.
#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    /// Messages to publish.
    messages: [WireMessage<'a>; 1],
}

/// Single message in a publish request.
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    /// Base64 encoded body.
    data: String,
    /// Message attributes.
    attributes: &'a BTreeMap<String, String>,
}

/// Publish response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    /// Server-assigned ids, one per message.
    #[serde(default)]
    message_ids: Vec<String>,
}

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Factory for Pub/Sub topic handles.
///
/// # Invariants
/// - `endpoint` is a valid URL without a trailing slash.
#[derive(Debug, Clone)]
pub struct PubSubHttpFactory {
    /// Base endpoint URL.
    endpoint: String,
    /// Project for short topic ids.
    project_id: Option<String>,
    /// Precomputed authorization header.
    authorization: Option<HeaderValue>,
    /// Shared HTTP client.
    client: Client,
}

impl PubSubHttpFactory {
    /// Builds a factory from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HandleOpenError::Unavailable`] when the endpoint or token is
    /// invalid or the HTTP client cannot be built.
    pub fn new(config: PubSubHttpConfig) -> Result<Self, HandleOpenError> {
        Url::parse(&config.endpoint).map_err(|err| {
            HandleOpenError::Unavailable(format!("invalid pubsub endpoint: {err}"))
        })?;
        let authorization = config
            .auth_token
            .as_deref()
            .map(|token| {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    HandleOpenError::Unavailable("invalid pubsub auth token".to_string())
                })?;
                value.set_sensitive(true);
                Ok::<_, HandleOpenError>(value)
            })
            .transpose()?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| HandleOpenError::Unavailable(err.to_string()))?;
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id,
            authorization,
            client,
        })
    }

    /// Returns the fully qualified resource name for `topic`.
    fn resource_name(&self, topic: &TopicId) -> Result<String, HandleOpenError> {
        if topic.is_qualified() {
            return Ok(topic.as_str().to_string());
        }
        let project = self.project_id.as_deref().ok_or_else(|| HandleOpenError::InvalidTopic {
            topic: topic.clone(),
            reason: "short topic id requires a project".to_string(),
        })?;
        Ok(format!("projects/{project}/topics/{}", topic.topic_name()))
    }
}

impl TopicHandleFactory for PubSubHttpFactory {
    fn open(&self, topic: &TopicId) -> Result<Arc<dyn TopicHandle>, HandleOpenError> {
        let resource = self.resource_name(topic)?;
        Ok(Arc::new(PubSubTopicHandle {
            topic: topic.clone(),
            publish_url: format!("{}/v1/{resource}:publish", self.endpoint),
            authorization: self.authorization.clone(),
            client: self.client.clone(),
            state: CloseFlag::default(),
        }))
    }
}

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Handle publishing to one Pub/Sub topic.
struct PubSubTopicHandle {
    /// Bound topic.
    topic: TopicId,
    /// Publish endpoint for the topic.
    publish_url: String,
    /// Authorization header.
    authorization: Option<HeaderValue>,
    /// HTTP client.
    client: Client,
    /// Close state.
    state: CloseFlag,
}

#[async_trait]
impl TopicHandle for PubSubTopicHandle {
    fn topic_id(&self) -> &TopicId {
        &self.topic
    }

    async fn publish(&self, message: Message) -> Result<PublishAck, PublishError> {
        self.state.ensure_open(&self.topic)?;
        let body = PublishRequest {
            messages: [WireMessage {
                data: STANDARD.encode(&message.data),
                attributes: &message.attributes,
            }],
        };
        let mut request = self.client.post(&self.publish_url).json(&body);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization.clone());
        }
        let response =
            request.send().await.map_err(|err| PublishError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                message: detail.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }
        let parsed: PublishResponse =
            response.json().await.map_err(|err| PublishError::Transport(err.to_string()))?;
        let message_id = parsed.message_ids.into_iter().next().ok_or_else(|| {
            PublishError::Transport("pubsub response carried no message id".to_string())
        })?;
        Ok(PublishAck {
            message_id,
            topic_id: self.topic.clone(),
        })
    }

    fn close(&self) {
        if self.state.close() {
            debug!(topic = %self.topic, "pubsub topic handle closed");
        }
    }
}
