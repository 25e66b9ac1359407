// crates/decouple-cli/src/main.rs
// ============================================================================
// Module: Decouple Ingress CLI Entry Point
// Description: Command dispatcher for sending events and checking routing.
// Purpose: Provide operator tooling around the decouple ingress library.
// Dependencies: clap, decouple-config, decouple-core, decouple-ingress, tokio
// ============================================================================

//! ## Overview
//! The `decouple-ingress` binary sends a single CloudEvent through a
//! [`DecoupleSink`] built from configuration, validates configuration files,
//! and reports how each broker in a routing document would classify.
//! Command output goes to stdout; logs, errors, and log-transport records go
//! to stderr.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod logging;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Stderr;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use decouple_config::IngressConfig;
use decouple_config::LogConfig;
use decouple_config::TransportConfig;
use decouple_core::BrokerIdentity;
use decouple_core::Event;
use decouple_core::PublishAck;
use decouple_core::TopicId;
use decouple_core::TraceContext;
use decouple_ingress::DecoupleError;
use decouple_ingress::DecoupleSink;
use decouple_ingress::ErrorKind;
use decouple_ingress::FileRoutingTable;
use decouple_ingress::LogTopicFactory;
use decouple_ingress::PubSubHttpConfig;
use decouple_ingress::PubSubHttpFactory;
use decouple_ingress::RoutingSnapshot;
use decouple_ingress::SendContext;
use decouple_ingress::classify_route;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a structured-JSON event input.
const MAX_EVENT_BYTES: usize = 1024 * 1024;
/// Routing document size cap used by `routes check` when none is given.
const DEFAULT_ROUTES_MAX_BYTES: u64 = 4 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "decouple-ingress", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one structured-JSON CloudEvent to a broker.
    Send(SendCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Routing document utilities.
    Routes {
        /// Selected routes subcommand.
        #[command(subcommand)]
        command: RoutesCommand,
    },
}

/// Arguments for `send`.
#[derive(Args, Debug)]
struct SendCommand {
    /// Optional config file path (defaults to decouple-ingress.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Target broker as `namespace/name`.
    #[arg(long, value_name = "BROKER")]
    broker: String,
    /// Structured-JSON CloudEvent file.
    #[arg(long, value_name = "PATH")]
    event: PathBuf,
    /// W3C traceparent to propagate.
    #[arg(long, value_name = "TRACEPARENT")]
    traceparent: Option<String>,
    /// W3C tracestate to propagate alongside `--traceparent`.
    #[arg(long, value_name = "TRACESTATE", requires = "traceparent")]
    tracestate: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to decouple-ingress.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Routes subcommands.
#[derive(Subcommand, Debug)]
enum RoutesCommand {
    /// Classify every broker in a routing document.
    Check(RoutesCheckCommand),
}

/// Arguments for `routes check`.
#[derive(Args, Debug)]
struct RoutesCheckCommand {
    /// Routing document path.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
    /// Size cap applied to the routing document.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_ROUTES_MAX_BYTES)]
    max_bytes: u64,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Send(command) => command_send(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Routes {
            command,
        } => command_routes(command),
    }
}

// ============================================================================
// SECTION: Send Command
// ============================================================================

/// Executes the send command.
async fn command_send(command: SendCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    logging::init(&config.log)?;

    let broker = BrokerIdentity::parse(&command.broker)
        .map_err(|err| CliError::new(format!("invalid broker: {err}")))?;
    let event = read_event(&command.event)?;
    let trace = parse_trace(command.traceparent.as_deref(), command.tracestate.as_deref())?;
    let mut ctx = SendContext::new();
    if let Some(trace) = trace {
        ctx = ctx.with_trace(trace);
    }

    let (routing, refresh) = start_routing(&config)?;
    let sink = build_sink(&config, routing).inspect_err(|_| refresh.abort())?;
    let result = sink.send_to(&broker, &event, &ctx).await;
    refresh.abort();
    sink.shutdown().map_err(|err| send_error(&err))?;
    let ack = result.map_err(|err| send_error(&err))?;
    info!(broker = %broker, topic = %ack.topic_id, message_id = %ack.message_id, "event published");

    write_stdout_line(&ack_json(&broker, &ack).to_string())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads the routing document and starts reloading it every
/// `routing.refresh_interval_ms`.
fn start_routing(
    config: &IngressConfig,
) -> CliResult<(Arc<FileRoutingTable>, JoinHandle<()>)> {
    let routing = FileRoutingTable::open(&config.routing.path, config.routing.max_file_bytes)
        .map_err(|err| {
            CliError::new(format!(
                "failed to load routing document {}: {err}",
                config.routing.path.display()
            ))
        })?;
    let routing = Arc::new(routing);
    let refresh = routing.spawn_refresh(config.routing.refresh_interval());
    Ok((routing, refresh))
}

/// Log transport used by `send`; records go to stderr so stdout carries only
/// the acknowledgement.
fn log_transport() -> LogTopicFactory<Stderr> {
    LogTopicFactory::new(std::io::stderr())
}

/// Builds a sink over `routing` and the configured transport.
fn build_sink(config: &IngressConfig, routing: Arc<FileRoutingTable>) -> CliResult<DecoupleSink> {
    let mut builder = DecoupleSink::builder().routing_table(routing);
    if let Some(timeout) = config.publish.timeout() {
        builder = builder.publish_timeout(timeout);
    }
    builder = match &config.transport {
        TransportConfig::Log => builder.topic_factory(log_transport()),
        TransportConfig::PubsubHttp(settings) => {
            let resolved =
                settings.resolve().map_err(|err| CliError::new(config_error_message(&err)))?;
            let factory = PubSubHttpFactory::new(PubSubHttpConfig {
                endpoint: resolved.endpoint,
                project_id: resolved.project_id,
                auth_token: resolved.auth_token,
                connect_timeout: resolved.connect_timeout,
                request_timeout: resolved.request_timeout,
            })
            .map_err(|err| CliError::new(format!("failed to build pubsub transport: {err}")))?;
            builder.topic_factory(factory)
        }
    };
    builder.build().map_err(|err| CliError::new(format!("failed to build sink: {err}")))
}

/// Reads and validates a structured-JSON event file.
fn read_event(path: &Path) -> CliResult<Event> {
    let bytes = read_bytes_with_limit(path, MAX_EVENT_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read event {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "event {} exceeds size limit ({size} > {limit})",
            path.display()
        )),
    })?;
    let event: Event = serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid event {}: {err}", path.display())))?;
    event
        .validate()
        .map_err(|err| CliError::new(format!("invalid event {}: {err}", path.display())))?;
    Ok(event)
}

/// Parses optional trace context arguments.
fn parse_trace(
    traceparent: Option<&str>,
    tracestate: Option<&str>,
) -> CliResult<Option<TraceContext>> {
    let Some(traceparent) = traceparent else {
        return Ok(None);
    };
    let mut trace = TraceContext::parse_traceparent(traceparent)
        .map_err(|err| CliError::new(format!("invalid traceparent: {err}")))?;
    if let Some(tracestate) = tracestate {
        trace = trace.with_tracestate(tracestate);
    }
    Ok(Some(trace))
}

/// Renders a publish acknowledgement as JSON.
fn ack_json(broker: &BrokerIdentity, ack: &PublishAck) -> Value {
    json!({
        "broker": broker.to_string(),
        "topic_id": ack.topic_id.as_str(),
        "message_id": ack.message_id,
    })
}

/// Formats a send failure with its stable kind label.
fn send_error(err: &DecoupleError) -> CliError {
    let retry = if err.is_retryable() { "retryable" } else { "not retryable" };
    CliError::new(format!("send failed [{}, {retry}]: {err}", err.kind()))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    logging::init(&config.log)?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration, mapping errors to CLI messages.
fn load_config(path: Option<&Path>) -> CliResult<IngressConfig> {
    IngressConfig::load(path).map_err(|err| CliError::new(config_error_message(&err)))
}

/// Formats a configuration failure.
fn config_error_message(err: &decouple_config::ConfigError) -> String {
    format!("failed to load config: {err}")
}

// ============================================================================
// SECTION: Routes Commands
// ============================================================================

/// Dispatches routes subcommands.
fn command_routes(command: RoutesCommand) -> CliResult<ExitCode> {
    match command {
        RoutesCommand::Check(command) => command_routes_check(&command),
    }
}

/// Executes the routes check command.
///
/// Exits with failure when any broker is incomplete.
fn command_routes_check(command: &RoutesCheckCommand) -> CliResult<ExitCode> {
    logging::init(&LogConfig::default())?;
    let snapshot = RoutingSnapshot::load(&command.file, command.max_bytes).map_err(|err| {
        CliError::new(format!(
            "failed to load routing document {}: {err}",
            command.file.display()
        ))
    })?;
    let mut incomplete = 0_usize;
    for (broker, route) in snapshot.routes() {
        let classification = classify_route(&broker, Some(route));
        if matches!(&classification, Err(err) if err.kind() == ErrorKind::Incomplete) {
            incomplete += 1;
        }
        write_stdout_line(&route_line(&broker, &classification))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    if incomplete > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Returns the status label for a route classification.
fn classification_label(classification: &Result<TopicId, DecoupleError>) -> &'static str {
    match classification {
        Ok(_) => "ready",
        Err(err) => match err.kind() {
            ErrorKind::NotReady => "not_ready",
            ErrorKind::NotFound => "not_found",
            _ => "incomplete",
        },
    }
}

/// Renders one `routes check` output line.
fn route_line(broker: &BrokerIdentity, classification: &Result<TopicId, DecoupleError>) -> String {
    let label = classification_label(classification);
    match classification {
        Ok(topic) => format!("{broker}\t{label}\t{topic}"),
        Err(_) => format!("{broker}\t{label}"),
    }
}

// ============================================================================
// SECTION: IO Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
