// crates/decouple-config/src/logging.rs
// ============================================================================
// Module: Logging Configuration
// Description: The `[log]` table controlling tracing output.
// Purpose: Select the level filter and output format for binaries.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Library crates only emit `tracing` events; binaries read this table to
//! install a subscriber.
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "console"
//! ```

use serde::Deserialize;

/// Log level.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Very verbose.
    Trace,
    /// Debugging information, including routing classification.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Returns the tracing filter directive for this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output.
    #[default]
    Console,
    /// JSON lines.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Level filter.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        let config: LogConfig = toml::from_str("").unwrap();
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Console);
    }

    #[test]
    fn parses_every_level() {
        for (raw, expected) in [
            ("trace", LogLevel::Trace),
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warn", LogLevel::Warn),
            ("error", LogLevel::Error),
        ] {
            let config: LogConfig = toml::from_str(&format!("level = \"{raw}\"")).unwrap();
            assert_eq!(config.level, expected);
            assert_eq!(expected.as_str(), raw);
        }
    }

    #[test]
    fn parses_json_format() {
        let config: LogConfig = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<LogConfig>("output = \"stderr\"").is_err());
    }
}
