// crates/decouple-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Tracing subscriber installation for the CLI binary.
// Purpose: Route library tracing events to stderr per the `[log]` table.
// Dependencies: decouple-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! `RUST_LOG` wins over the configured level when set. Output always goes to
//! stderr so command output on stdout stays machine-readable.

use decouple_config::LogConfig;
use decouple_config::LogFormat;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::CliError;
use crate::CliResult;

/// Builds the level filter for `config`.
pub(crate) fn filter_for(config: &LogConfig) -> CliResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.as_str()))
        .map_err(|err| CliError::new(format!("invalid log level: {err}")))
}

/// Installs the global subscriber.
pub(crate) fn init(config: &LogConfig) -> CliResult<()> {
    let registry = tracing_subscriber::registry().with(filter_for(config)?);
    let result = match config.format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => {
            registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
        }
    };
    result.map_err(|err| CliError::new(format!("failed to initialise logging: {err}")))
}
