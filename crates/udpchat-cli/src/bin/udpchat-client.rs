//! udpchat client: an interactive console on stdin/stdout.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use udpchat::prelude::*;
use udpchat_cli::{init_logging, load_json, resolve, CommonArgs};

/// Chat client over reliable UDP.
#[derive(Parser, Debug)]
#[command(name = "udpchat-client", version, about, long_about = None)]
struct Cli {
    /// The username of the client
    #[arg(short, long)]
    user: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.verbose)?;

    let transport: TransportConfig = match &cli.common.config {
        Some(path) => load_json(path)?,
        None => TransportConfig::default(),
    };
    let server = resolve(&cli.common.host_port(None)).await?;
    info!(window = cli.common.window, "window size unused, transfers are stop-and-wait");

    let client = ChatClient::connect(server, &cli.user, transport)
        .await
        .with_context(|| format!("failed to join {server}"))?;

    client
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;
    Ok(())
}
