use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use asset_packager::AssetIndex;
use asset_packager_server::{Server, ServerConfig, ServerResult};

/// Serve gzip-compressed tar packages of files under a watched directory.
#[derive(Debug, Parser)]
#[command(name = "asset-packager", version)]
struct Cli {
    /// Directory to index and serve assets from.
    asset_dir: Option<PathBuf>,

    /// JSON config file; command-line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8080.
    #[arg(long)]
    bind: Option<String>,

    /// Prefix applied to every entry name inside served packages.
    #[arg(long)]
    prefix: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    }
    .with_overrides(cli.asset_dir, cli.bind, cli.prefix);
    config.validate()?;

    let index = Arc::new(AssetIndex::open(&config.asset_dir)?);
    let server = Server::start(&config, index.clone()).await?;

    if let Err(error) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for shutdown signal: {error}");
    }
    log::info!("shutting down package server on {}", server.addr());

    if let Err(error) = server.stop().await {
        log::warn!("{error}");
    }
    index.close();
    Ok(())
}
