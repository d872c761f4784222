//! Checklist development gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                      GATEWAY                      │
//!                         │                                                   │
//!   Client Request        │  ┌─────────┐    ┌──────────────┐                  │
//!   ──────────────────────┼─▶│  http   │───▶│   routing    │                  │
//!                         │  │ server  │    │ route table  │                  │
//!                         │  └─────────┘    └──────┬───────┘                  │
//!                         │                        │                          │
//!                         │          ┌─────────────┼──────────────┐           │
//!                         │          ▼             ▼              ▼           │
//!                         │   ┌────────────┐ ┌───────────┐ ┌─────────────┐    │
//!                         │   │  upgrade   │ │ dev/build │ │  external   │    │
//!                         │   │ redirector │ │  switch   │ │   routes    │    │
//!                         │   └────────────┘ └─────┬─────┘ └──────┬──────┘    │
//!                         │                  probe │ bundle       │           │
//!                         │                        ▼              ▼           │
//!   Client Response       │                  ┌──────────────────────────┐     │
//!   ◀─────────────────────┼──────────────────│ retry coordinator        │◀────┼── dev server,
//!                         │                  │ + upstream client        │     │   webhook, ERP
//!                         │                  │ + content normalizer     │     │
//!                         │                  └──────────────────────────┘     │
//!                         └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use checklist_gateway::config::load_config;
use checklist_gateway::lifecycle::{wait_for_signal, Shutdown};
use checklist_gateway::observability::{init_logging, metrics::init_metrics};
use checklist_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "checklist-gateway")]
#[command(about = "Development gateway for the checklist frontend", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults and environment are used without it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port, overriding the config file and PORT.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.listener.set_port(&port.to_string());
    }

    let _log_guard = init_logging(&config.observability)?;
    tracing::info!("checklist-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        dev_server = %config.upstreams.dev_server_url,
        webhook = %config.upstreams.webhook_base_url,
        erp = %config.upstreams.erp_base_url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
