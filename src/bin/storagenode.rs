//! The Storage Node binary: loads configuration, initialises logging, and serves
//! the client port, the NN control port, and the heartbeat session.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use scriptorium::config::{self, SnConfig};
use scriptorium::sn::backend::FsBackend;
use scriptorium::sn::{self, SnState};

#[derive(Parser, Debug)]
#[command(name = "storagenode", about = "Storage Node: content, metadata, undo and checkpoints")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured bind address.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Overrides the configured client port.
    #[arg(long)]
    client_port: Option<u16>,

    /// Overrides the configured NN control port.
    #[arg(long)]
    control_port: Option<u16>,

    /// Overrides the configured Name Node address (`host:port`).
    #[arg(long)]
    nn_addr: Option<String>,

    /// Overrides the configured content directory.
    #[arg(long)]
    content_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut cfg: SnConfig = config::load(args.config.as_deref()).map_err(std::io::Error::other)?;
    if let Some(bind_addr) = args.bind_addr {
        cfg.bind_addr = bind_addr;
    }
    if let Some(port) = args.client_port {
        cfg.client_port = port;
    }
    if let Some(port) = args.control_port {
        cfg.control_port = port;
    }
    if let Some(nn_addr) = args.nn_addr {
        cfg.nn_addr = nn_addr;
    }
    if let Some(content_dir) = args.content_dir {
        cfg.content_dir = content_dir;
    }

    let backend = Arc::new(FsBackend::new(cfg.content_dir.clone()));
    let state = Arc::new(SnState::new(backend, cfg));
    sn::server::run(state).await
}
