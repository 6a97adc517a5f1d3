//! udpchat server.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use udpchat::prelude::*;
use udpchat_cli::{init_logging, load_json, CommonArgs};

/// Chat server over reliable UDP.
#[derive(Parser, Debug)]
#[command(name = "udpchat-server", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.verbose)?;

    let mut config: ServerConfig = match &cli.common.config {
        Some(path) => load_json(path)?,
        None => ServerConfig::default(),
    };
    config.bind = cli.common.host_port(Some(&config.bind));
    info!(window = cli.common.window, "window size unused, transfers are stop-and-wait");

    let server = ChatServerBuilder::from_config(config)
        .build()
        .await
        .context("failed to start server")?;
    let handle = server.handle();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupted, shutting down"),
            Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
        }
        handle.shutdown();
    });

    server.run().await?;
    Ok(())
}
