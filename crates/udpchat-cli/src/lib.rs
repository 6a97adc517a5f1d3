//! Shared plumbing for the `udpchat-server` and `udpchat-client` binaries:
//! the common command-line options, logging setup, and config file loading.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;
use udpchat::DEFAULT_PORT;

/// Default host for both binaries.
pub const DEFAULT_ADDRESS: &str = "localhost";

/// Default (unused) window size.
pub const DEFAULT_WINDOW: usize = 3;

/// Options shared by the server and the client.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// The server port [default: 15000]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// The server ip or hostname [default: localhost]
    #[arg(short, long)]
    pub address: Option<String>,

    /// The window size. Transfers are stop-and-wait, so this is only logged
    #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// `host:port`, taking each part from the flags first, then from
    /// `fallback` (a `host:port` string from a config file), then from the
    /// defaults.
    pub fn host_port(&self, fallback: Option<&str>) -> String {
        let (file_host, file_port) = match fallback.and_then(|f| f.rsplit_once(':')) {
            Some((host, port)) => (Some(host), port.parse::<u16>().ok()),
            None => (None, None),
        };
        let host = self
            .address
            .as_deref()
            .or(file_host)
            .unwrap_or(DEFAULT_ADDRESS);
        let port = self.port.or(file_port).unwrap_or(DEFAULT_PORT);
        format!("{host}:{port}")
    }
}

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug`
/// with `verbose`.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to install tracing subscriber")
}

/// Reads and parses a JSON config file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

/// Resolves `host:port`, preferring an IPv4 address.
pub async fn resolve(host_port: &str) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(host_port)
        .await
        .with_context(|| format!("failed to resolve {host_port}"))?
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .with_context(|| format!("{host_port} resolved to no addresses"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use udpchat::prelude::*;

    #[test]
    fn test_host_port_defaults() {
        let args = CommonArgs::default();
        assert_eq!(args.host_port(None), "localhost:15000");
    }

    #[test]
    fn test_host_port_flags_override_file() {
        let args = CommonArgs {
            port: Some(9000),
            ..CommonArgs::default()
        };
        assert_eq!(args.host_port(Some("0.0.0.0:7000")), "0.0.0.0:9000");
    }

    #[test]
    fn test_host_port_file_fills_missing_flags() {
        let args = CommonArgs {
            address: Some("10.0.0.1".into()),
            ..CommonArgs::default()
        };
        assert_eq!(args.host_port(Some("0.0.0.0:7000")), "10.0.0.1:7000");
    }

    #[test]
    fn test_load_json_reads_server_config() {
        let path = std::env::temp_dir().join(format!("udpchat-cli-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "directory": { "max_clients": 3 } }"#).unwrap();

        let cfg: ServerConfig = load_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.directory.max_clients, 3);
        assert_eq!(cfg.bind, "localhost:15000");
    }

    #[test]
    fn test_load_json_missing_file_is_error() {
        let result: Result<TransportConfig> = load_json(Path::new("/nonexistent/udpchat.json"));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_resolve_loopback() {
        let addr = resolve("127.0.0.1:15000").await.unwrap();
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 15000)));
    }
}
