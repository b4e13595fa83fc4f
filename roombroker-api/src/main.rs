use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use roombroker_core::config::Config;

#[derive(Parser, Debug)]
#[command(name = "roombroker-api")]
#[command(author, version, about = "Room broker gRPC server", long_about = None)]
struct Args {
    /// TOML configuration file (default: ROOMBROKER_* environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the gRPC listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(listen) = args.listen {
        config.server.listen_address = listen;
    }

    roombroker_api::run(config).await?;

    Ok(())
}
