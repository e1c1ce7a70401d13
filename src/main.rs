//! MCP Server Entry Point
//!
//! This is the main entry point for the MCP server. It initializes logging,
//! loads configuration, builds the tool registry and starts the server with
//! the configured transport.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use infra_mcp_server::clients::Upstream;
use infra_mcp_server::core::config::LoggingConfig;
use infra_mcp_server::core::{Config, ContextFactory, McpServer, TransportService, shutdown};
use infra_mcp_server::domains::tools::build_tool_registry;

/// Grace period for blocking work (the stdin reader) once serving has stopped.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging first, so configuration loading can report what it found
    init_logging(&LoggingConfig::from_env().level);

    // Load configuration from environment
    let config = Config::from_env();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run(config));

    // The STDIO reader blocks a pool thread that cannot be interrupted.
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    result
}

async fn run(config: Config) -> Result<()> {
    info!("Starting {} v{}", config.server.name, config.server.version);

    let config = Arc::new(config);
    let shutdown_token = CancellationToken::new();
    shutdown::install_signal_handler(shutdown_token.clone());

    // Build upstream clients and the tool registry
    let upstream = Upstream::from_config(&config)?;
    let registry = Arc::new(build_tool_registry(config.clone(), &upstream));

    let server = McpServer::new(config.clone(), registry);
    let contexts = ContextFactory::new(upstream.connector(), shutdown_token.clone());

    // Create and run the transport service
    let transport = TransportService::new(
        config.transport.clone(),
        config.credentials.clone(),
        shutdown_token,
    );
    transport.run(server, contexts).await?;

    info!("Server shutting down");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Logs always go to stderr: stdout belongs to the STDIO transport.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
