// crates/decouple-config/src/config.rs
// ============================================================================
// Module: Ingress Configuration
// Description: Configuration loading and validation for the decouple ingress.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys, out-of-range values, and malformed paths fail closed.
//! Environment lookups (config path override, Pub/Sub project and token)
//! happen only in [`IngressConfig::load`] and [`PubSubHttpSettings::resolve`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::logging::LogConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "decouple-ingress.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "DECOUPLE_INGRESS_CONFIG";
/// Environment variable supplying the default Pub/Sub project.
pub const PROJECT_ID_ENV_VAR: &str = "PROJECT_ID";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default routing refresh interval in milliseconds.
const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1_000;
/// Minimum routing refresh interval in milliseconds.
const MIN_REFRESH_INTERVAL_MS: u64 = 100;
/// Maximum routing refresh interval in milliseconds.
const MAX_REFRESH_INTERVAL_MS: u64 = 600_000;
/// Default routing document size cap in bytes.
const DEFAULT_MAX_ROUTING_FILE_BYTES: u64 = 4 * 1024 * 1024;
/// Maximum routing document size cap in bytes.
const MAX_ROUTING_FILE_BYTES: u64 = 64 * 1024 * 1024;
/// Minimum publish timeout in milliseconds.
const MIN_PUBLISH_TIMEOUT_MS: u64 = 1;
/// Maximum publish timeout in milliseconds.
const MAX_PUBLISH_TIMEOUT_MS: u64 = 300_000;
/// Default Pub/Sub REST endpoint.
const DEFAULT_PUBSUB_ENDPOINT: &str = "https://pubsub.googleapis.com";
/// Default Pub/Sub connect timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
/// Default Pub/Sub request timeout in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Minimum Pub/Sub HTTP timeout in milliseconds.
const MIN_HTTP_TIMEOUT_MS: u64 = 100;
/// Maximum Pub/Sub connect timeout in milliseconds.
const MAX_CONNECT_TIMEOUT_MS: u64 = 60_000;
/// Maximum Pub/Sub request timeout in milliseconds.
const MAX_REQUEST_TIMEOUT_MS: u64 = 300_000;
/// Maximum length of a Pub/Sub project id.
const MAX_PROJECT_ID_LENGTH: usize = 30;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O error while reading config.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Validation error.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Decouple ingress configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngressConfig {
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Routing document configuration.
    pub routing: RoutingConfig,
    /// Publish behavior.
    #[serde(default)]
    pub publish: PublishConfig,
    /// Downstream transport selection.
    #[serde(default)]
    pub transport: TransportConfig,
}

impl IngressConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then [`CONFIG_ENV_VAR`], then
    /// `decouple-ingress.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.routing.validate()?;
        self.publish.validate()?;
        self.transport.validate()
    }
}

// ============================================================================
// SECTION: Routing
// ============================================================================

/// Routing document configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Path of the JSON routing document mounted by the control plane.
    pub path: PathBuf,
    /// Interval between routing document reloads.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Size cap applied to the routing document.
    #[serde(default = "default_max_routing_file_bytes")]
    pub max_file_bytes: u64,
}

impl RoutingConfig {
    /// Returns the reload interval.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Validates routing configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("routing.path", &self.path.to_string_lossy())?;
        validate_timeout_range(
            "routing.refresh_interval_ms",
            self.refresh_interval_ms,
            MIN_REFRESH_INTERVAL_MS,
            MAX_REFRESH_INTERVAL_MS,
        )?;
        if self.max_file_bytes == 0 || self.max_file_bytes > MAX_ROUTING_FILE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "routing.max_file_bytes must be between 1 and {MAX_ROUTING_FILE_BYTES}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Publish
// ============================================================================

/// Publish behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    /// Upper bound on a single publish; the sink default applies when unset.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl PublishConfig {
    /// Returns the configured publish timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Validates publish configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(timeout_ms) = self.timeout_ms {
            validate_timeout_range(
                "publish.timeout_ms",
                timeout_ms,
                MIN_PUBLISH_TIMEOUT_MS,
                MAX_PUBLISH_TIMEOUT_MS,
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Downstream transport selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// JSON lines written to stdout.
    #[default]
    Log,
    /// Google Cloud Pub/Sub REST publisher.
    PubsubHttp(PubSubHttpSettings),
}

impl TransportConfig {
    /// Validates transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Log => Ok(()),
            Self::PubsubHttp(settings) => settings.validate(),
        }
    }
}

/// Pub/Sub REST transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PubSubHttpSettings {
    /// Base URL of the Pub/Sub REST API.
    #[serde(default = "default_pubsub_endpoint")]
    pub endpoint: String,
    /// Project used to qualify short topic ids.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Environment variable holding the bearer token.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for PubSubHttpSettings {
    fn default() -> Self {
        Self {
            endpoint: default_pubsub_endpoint(),
            project_id: None,
            token_env: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

/// Pub/Sub settings with environment lookups applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPubSub {
    /// Base URL of the Pub/Sub REST API.
    pub endpoint: String,
    /// Project used to qualify short topic ids.
    pub project_id: Option<String>,
    /// Bearer token, when configured.
    pub auth_token: Option<String>,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
}

impl PubSubHttpSettings {
    /// Resolves the project and token from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `token_env` names an unset or
    /// empty variable.
    pub fn resolve(&self) -> Result<ResolvedPubSub, ConfigError> {
        self.resolve_with(|key| env::var(key).ok())
    }

    /// Resolves the project and token using `lookup` for environment values.
    ///
    /// An explicit `project_id` wins over [`PROJECT_ID_ENV_VAR`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `token_env` names an unset or
    /// empty variable.
    pub fn resolve_with<F>(&self, lookup: F) -> Result<ResolvedPubSub, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_id = self
            .project_id
            .clone()
            .or_else(|| lookup(PROJECT_ID_ENV_VAR))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let auth_token = match &self.token_env {
            None => None,
            Some(name) => {
                let token = lookup(name.as_str())
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| {
                        ConfigError::Invalid(format!("transport.token_env {name} is not set"))
                    })?;
                Some(token)
            }
        };
        Ok(ResolvedPubSub {
            endpoint: self.endpoint.trim_end_matches('/').to_string(),
            project_id,
            auth_token,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        })
    }

    /// Validates Pub/Sub settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(
                "transport.endpoint must be an http or https url".to_string(),
            ));
        }
        if let Some(project_id) = &self.project_id {
            let project_id = project_id.trim();
            if project_id.is_empty() || project_id.len() > MAX_PROJECT_ID_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "transport.project_id must be 1..={MAX_PROJECT_ID_LENGTH} characters"
                )));
            }
            if project_id.contains('/') {
                return Err(ConfigError::Invalid(
                    "transport.project_id must not contain '/'".to_string(),
                ));
            }
        }
        if let Some(token_env) = &self.token_env
            && token_env.trim().is_empty()
        {
            return Err(ConfigError::Invalid("transport.token_env must be non-empty".to_string()));
        }
        validate_timeout_range(
            "transport.connect_timeout_ms",
            self.connect_timeout_ms,
            MIN_HTTP_TIMEOUT_MS,
            MAX_CONNECT_TIMEOUT_MS,
        )?;
        validate_timeout_range(
            "transport.request_timeout_ms",
            self.request_timeout_ms,
            MIN_HTTP_TIMEOUT_MS,
            MAX_REQUEST_TIMEOUT_MS,
        )
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default routing refresh interval.
const fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

/// Default routing document size cap.
const fn default_max_routing_file_bytes() -> u64 {
    DEFAULT_MAX_ROUTING_FILE_BYTES
}

/// Default Pub/Sub endpoint.
fn default_pubsub_endpoint() -> String {
    DEFAULT_PUBSUB_ENDPOINT.to_string()
}

/// Default Pub/Sub connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Default Pub/Sub request timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from explicit input or the environment.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a millisecond value against an inclusive range.
fn validate_timeout_range(
    field: &str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min_ms} and {max_ms} milliseconds",
        )));
    }
    Ok(())
}
