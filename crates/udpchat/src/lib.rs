//! # udpchat
//!
//! A multi-user chat service over raw UDP.
//!
//! The layers, bottom up:
//!
//! - [`udpchat_protocol`]: packet framing, CRC-32, message codec.
//! - [`udpchat_transport`]: reliable stop-and-wait delivery per peer.
//! - [`udpchat_session`]: the server's endpoint ↔ username directory.
//! - this crate: the server router and loop, and the client console.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use udpchat::prelude::*;
//!
//! # async fn start() -> Result<(), ChatError> {
//! let server = ChatServer::builder()
//!     .bind("127.0.0.1:15000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod client;
mod error;
pub mod router;
mod server;

pub use error::ChatError;
pub use server::{ChatServer, ChatServerBuilder, ServerConfig, DEFAULT_PORT};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::client::{ChatClient, ClientAction, Command};
    pub use crate::router::{Outbound, Policy, Rejection, Routed};
    pub use crate::{ChatError, ChatServer, ChatServerBuilder, ServerConfig, DEFAULT_PORT};
    pub use udpchat_protocol::{AppMessage, MessageType};
    pub use udpchat_session::{Directory, DirectoryConfig};
    pub use udpchat_transport::{EndpointHandle, ReliableEndpoint, TransportConfig};
}
