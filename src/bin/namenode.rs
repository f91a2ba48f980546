//! The Name Node binary: loads configuration, initialises logging, and serves the
//! client-facing port plus the background failure-detection scan.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use scriptorium::config::{self, NnConfig};
use scriptorium::nn::{self, NnState};

#[derive(Parser, Debug)]
#[command(name = "namenode", about = "Name Node: namespace, placement, locks and failure detection")]
struct Args {
    /// Path to a TOML config file (see `SnConfig`/`NnConfig` for the schema).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured bind address.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Overrides the configured client port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut cfg: NnConfig = config::load(args.config.as_deref()).map_err(std::io::Error::other)?;
    if let Some(bind_addr) = args.bind_addr {
        cfg.bind_addr = bind_addr;
    }
    if let Some(port) = args.port {
        cfg.port = port;
    }

    let state = Arc::new(NnState::new(cfg));
    nn::server::run(state).await
}
