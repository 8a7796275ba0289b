mod config;
mod files;
mod http_date;
mod listeners;
mod overlay;
mod path;
mod readiness;
mod store;
mod tls;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{Args, ServerConfig};
use files::FileService;
use overlay::TailscaleNode;
use store::S3Store;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Nothing touches the network until the configuration is valid.
    let config = Arc::new(ServerConfig::from_args(args).context("Invalid configuration")?);

    info!(
        "Starting tailnet-s3-proxy for bucket {} (prefix {:?})",
        config.storage.bucket, config.storage.key_prefix
    );

    let store = S3Store::new(&config.storage).context("Failed to create storage client")?;
    store
        .verify_access()
        .await
        .context("Storage credentials check failed")?;

    let node = TailscaleNode::start(&config.node)
        .await
        .context("Error starting tailnet node")?;

    let files = Arc::new(FileService::new(
        Arc::new(store),
        config.storage.key_prefix.clone(),
    ))
    .router();

    listeners::run(config, Arc::new(node), files).await
}
