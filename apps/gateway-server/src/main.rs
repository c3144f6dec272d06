use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gateway_server::{AppConfig, logging, run};

/// Zero-trust tenant guard gateway.
#[derive(Parser, Debug)]
#[command(name = "zt-gateway-server", version, about)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Listen address, overriding `server.bind_addr`.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(addr) = cli.bind {
        config.server.bind_addr = addr;
    }

    if cli.print_config {
        let rendered =
            serde_json::to_string_pretty(&config).context("failed to render configuration")?;
        println!("{rendered}");
        return Ok(());
    }

    logging::init_logging(&config.logging)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        tenants = config.store.tenants.len(),
        "starting tenant guard gateway"
    );

    run(config).await
}
