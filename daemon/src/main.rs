//! Merit daemon — entry point for running a merit node.

use clap::Parser;
use std::path::PathBuf;

use merit_node::{init_logging, LogFormat, MeritNode, NodeConfig};

#[derive(Parser)]
#[command(name = "merit-daemon", about = "Merit rewards pipeline node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "MERIT_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB store.
    #[arg(long, env = "MERIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JSON-RPC endpoint of the chain the contract lives on.
    #[arg(long, env = "MERIT_CHAIN_RPC_URL")]
    chain_rpc_url: Option<String>,

    /// Port for the realtime WebSocket server.
    #[arg(long, env = "MERIT_REALTIME_PORT")]
    realtime_port: Option<u16>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "MERIT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "MERIT_LOG_FORMAT")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => NodeConfig::from_toml_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(chain_rpc_url) = cli.chain_rpc_url {
        config.chain_rpc_url = chain_rpc_url;
    }
    if let Some(realtime_port) = cli.realtime_port {
        config.realtime_port = realtime_port;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }
    if let Some(log_format) = cli.log_format {
        config.log_format = log_format;
    }

    let log_format: LogFormat = config.log_format.parse()?;
    init_logging(log_format, &config.log_level);

    if let Some(ref path) = cli.config {
        tracing::info!("loaded config from {}", path.display());
    }
    tracing::info!(
        "starting merit node (chain: {}, realtime: {}, data: {})",
        config.chain_rpc_url,
        config.realtime_port,
        config.data_dir.display(),
    );

    let mut node = MeritNode::new(config)?;
    node.start().await?;

    node.shutdown.wait_for_signal().await;
    tracing::info!("shutdown signal received — stopping node");
    node.stop().await?;

    tracing::info!("merit daemon exited cleanly");
    Ok(())
}
