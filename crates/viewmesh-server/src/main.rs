//! View-count replica binary
//!
//! Serves the replica endpoints and runs the anti-entropy loops until
//! Ctrl-C, then flushes one last time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use viewmesh_server::{parse_peer_list, ReplicaConfig, ReplicaNode};

#[derive(Parser)]
#[command(name = "viewmesh")]
#[command(about = "Replicated video view counter", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file path (TOML, or JSON with a .json extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stable, unique replica name
    #[arg(long)]
    replica_id: Option<String>,

    /// Comma-separated peer base URLs
    #[arg(long)]
    peers: Option<String>,

    /// Address to listen on
    #[arg(long)]
    listen: Option<String>,

    /// Pull loop period in milliseconds
    #[arg(long)]
    pull_interval_ms: Option<u64>,

    /// Flush loop period in milliseconds
    #[arg(long)]
    flush_interval_ms: Option<u64>,

    /// Peer fetch timeout in milliseconds
    #[arg(long)]
    peer_timeout_ms: Option<u64>,

    /// Counter snapshot file
    #[arg(long)]
    snapshot_path: Option<PathBuf>,

    /// Aggregate totals file
    #[arg(long)]
    aggregate_path: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<ReplicaConfig> {
        let mut config = match &self.config {
            Some(path) => ReplicaConfig::load_from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ReplicaConfig::default(),
        };
        config.merge_with_env()?;

        if let Some(id) = &self.replica_id {
            config.replica_id = id.clone();
        }
        if let Some(peers) = &self.peers {
            config.peer_urls = parse_peer_list(peers);
        }
        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ms) = self.pull_interval_ms {
            config.pull_interval_ms = ms;
        }
        if let Some(ms) = self.flush_interval_ms {
            config.flush_interval_ms = ms;
        }
        if let Some(ms) = self.peer_timeout_ms {
            config.peer_timeout_ms = ms;
        }
        if let Some(path) = &self.snapshot_path {
            config.snapshot_path = Some(path.clone());
        }
        if let Some(path) = &self.aggregate_path {
            config.aggregate_path = Some(path.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.load_config()?;
    let addr = config.socket_addr()?;
    let node = ReplicaNode::build(config).await?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    node.serve(listener, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
