//! Trellis node
//!
//! Hosts the sync engine and component registry for one peer and serves a
//! status endpoint.
//!
//! Usage:
//!   trellis-node --config trellis.toml --port 4002

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use trellis_node::{build_router, load_or_generate_identity, Node, NodeConfig};

#[derive(Parser, Debug)]
#[command(name = "trellis-node")]
#[command(about = "Trellis sync and component registry node")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "trellis.toml")]
    config: PathBuf,

    /// Path to identity key file
    #[arg(short, long, default_value = "trellis-identity.json")]
    identity: PathBuf,

    /// HTTP API port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Trellis node starting...");
    let mut config = NodeConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.http.port = port;
    }
    let identity = load_or_generate_identity(&args.identity)?;
    info!("Public key: {}", identity.public());

    let address = config.http.address();
    let node = Arc::new(Node::start(config, identity).await?);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind HTTP address {address}"))?;
    info!("HTTP status endpoint listening on {}", address);

    axum::serve(listener, build_router(node.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    node.shutdown().await;
    Ok(())
}
