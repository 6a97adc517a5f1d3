//! `ChatServer` builder and server loop.
//!
//! This ties the layers together: reliable transport → application message
//! codec → router → directory.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use udpchat_protocol::AppMessage;
use udpchat_session::{Directory, DirectoryConfig};
use udpchat_transport::{EndpointHandle, ReliableEndpoint, TransportConfig};

use crate::router::{self, Outbound, Rejection};
use crate::ChatError;

/// Default port the server listens on.
pub const DEFAULT_PORT: u16 = 15000;

/// Everything needed to start a server. Loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, `host:port`.
    pub bind: String,
    /// Reliable transport tuning.
    pub transport: TransportConfig,
    /// Directory limits.
    pub directory: DirectoryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: format!("localhost:{DEFAULT_PORT}"),
            transport: TransportConfig::default(),
            directory: DirectoryConfig::default(),
        }
    }
}

/// Builder for configuring and starting a chat server.
///
/// # Example
///
/// ```rust,ignore
/// use udpchat::prelude::*;
///
/// let server = ChatServer::builder()
///     .bind("0.0.0.0:15000")
///     .build()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Default)]
pub struct ChatServerBuilder {
    config: ServerConfig,
}

impl ChatServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a complete configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Sets the transport configuration.
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.config.transport = config;
        self
    }

    /// Sets the directory configuration.
    pub fn directory_config(mut self, config: DirectoryConfig) -> Self {
        self.config.directory = config;
        self
    }

    /// Binds the socket and builds the server.
    pub async fn build(self) -> Result<ChatServer, ChatError> {
        let endpoint = ReliableEndpoint::bind(&self.config.bind, self.config.transport).await?;
        Ok(ChatServer {
            endpoint,
            directory: Directory::new(self.config.directory),
        })
    }
}

/// A bound chat server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct ChatServer {
    endpoint: ReliableEndpoint,
    directory: Directory,
}

impl ChatServer {
    /// Creates a new builder.
    pub fn builder() -> ChatServerBuilder {
        ChatServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// A handle to the server's endpoint. Calling
    /// [`EndpointHandle::shutdown`] on it makes [`run()`](Self::run) return.
    pub fn handle(&self) -> EndpointHandle {
        self.endpoint.handle()
    }

    /// Runs the receive loop until the endpoint shuts down.
    ///
    /// A bad message never ends the loop; it is handled by the router's
    /// rejection policy and the loop moves on.
    pub async fn run(mut self) -> Result<(), ChatError> {
        tracing::info!(addr = %self.local_addr(), "chat server running");

        while let Some(delivery) = self.endpoint.recv().await {
            let from = delivery.from;
            if delivery.payload.trim().is_empty() {
                tracing::debug!(%from, "empty message, ignoring");
                continue;
            }

            let routed = match AppMessage::decode(&delivery.payload) {
                Ok(message) => router::route(&mut self.directory, from, message),
                Err(e) => {
                    tracing::warn!(%from, error = %e, "undecodable message");
                    router::reject(&mut self.directory, from, Rejection::UnknownMessage).into()
                }
            };

            if let Some(peer) = routed.release {
                self.endpoint.handle().forget(peer);
            }
            for out in routed.outbound {
                self.dispatch(out);
            }
        }

        tracing::info!("chat server stopped");
        Ok(())
    }

    /// Sends one message on its own task.
    fn dispatch(&self, out: Outbound) {
        let handle = self.endpoint.handle();
        let Outbound { to, message } = out;
        tokio::spawn(async move {
            if let Err(e) = handle.send(to, message.encode()).await {
                tracing::warn!(%to, kind = %message.kind, error = %e, "send failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default_binds_port_15000() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind, "localhost:15000");
        assert_eq!(cfg.directory.max_clients, 10);
    }

    #[test]
    fn test_server_config_partial_json_keeps_defaults() {
        let cfg: ServerConfig = serde_json::from_str(
            r#"{ "bind": "0.0.0.0:9000", "transport": { "retransmit_timeout_ms": 100 } }"#,
        )
        .unwrap();

        assert_eq!(cfg.bind, "0.0.0.0:9000");
        assert_eq!(cfg.transport.retransmit_timeout_ms, 100);
        assert_eq!(cfg.transport.chunk_size, 1400);
        assert_eq!(cfg.directory, DirectoryConfig::default());
    }

    #[test]
    fn test_builder_setters_override_config() {
        let builder = ChatServerBuilder::new()
            .bind("127.0.0.1:0")
            .directory_config(DirectoryConfig { max_clients: 2 });

        assert_eq!(builder.config.bind, "127.0.0.1:0");
        assert_eq!(builder.config.directory.max_clients, 2);
    }
}
