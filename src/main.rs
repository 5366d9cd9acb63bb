//! Capture Proxy
//!
//! A transparent HTTP forwarding proxy that logs every transaction.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    CAPTURE PROXY                      │
//!                      │                                                       │
//!   Client Request     │  ┌─────────┐   ┌─────────┐   ┌────────────┐           │
//!   ───────────────────┼─▶│  http   │──▶│ capture │──▶│  pipeline  │           │
//!                      │  │ server  │   │  body   │   │            │           │
//!                      │  └─────────┘   └─────────┘   └─────┬──────┘           │
//!                      │                                    │                  │
//!                      │                                    ▼                  │
//!                      │                             ┌────────────┐            │
//!                      │                             │ forwarding │────────────┼──▶ Destination
//!                      │                             │   engine   │◀───────────┼─── Host
//!                      │                             └─────┬──────┘            │
//!                      │                                   │ error? translate  │
//!   Client Response    │  ┌──────────┐   ┌──────────────┐  │                   │
//!   ◀──────────────────┼──│ response │◀──│ log records  │◀─┘                   │
//!                      │  │  replay  │   │ REQUEST/RESP │──▶ LogSink           │
//!                      │  └──────────┘   └──────────────┘                      │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use capture_proxy::config::loader::{load_config, ConfigError};
use capture_proxy::config::ProxyConfig;
use capture_proxy::observability::{logging::init_logging, metrics};
use capture_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "capture-proxy")]
#[command(about = "Transparent HTTP proxy that logs every request and response", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Destination host, e.g. http://127.0.0.1:9000 (overrides config and environment).
    #[arg(short, long)]
    destination: Option<String>,

    /// Listen address (overrides config and environment).
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(cli: &Cli) -> Result<ProxyConfig, ConfigError> {
    load_config(cli.config.as_deref(), |config| {
        if let Some(destination) = &cli.destination {
            config.destination.host = destination.clone();
        }
        if let Some(bind) = &cli.bind {
            config.listener.bind_address = bind.clone();
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    init_logging(&config.logging)?;

    tracing::info!("capture-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        destination = %config.destination.host,
        connect_timeout_ms = config.timeouts.connect_ms,
        response_timeout_ms = config.timeouts.response_ms,
        connection_request_timeout_ms = config.timeouts.connection_request_ms,
        max_total_connections = config.pool.max_total_connections,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
