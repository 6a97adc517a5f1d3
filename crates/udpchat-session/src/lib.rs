//! The server's chat directory for udpchat.
//!
//! A [`Directory`] is the live table of who is connected: a two-way
//! mapping between a network endpoint and a username. It enforces the
//! two server invariants:
//!
//! 1. **Capacity**: at most [`DirectoryConfig::max_clients`] entries.
//! 2. **Uniqueness**: a username belongs to at most one endpoint.
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)  ← consults the directory for every inbound message
//!     ↕
//! Directory (this crate)  ← endpoint ↔ username
//!     ↕
//! Protocol (below)  ← provides the MAX_CLIENTS default
//! ```

mod config;
mod directory;
mod error;

pub use config::DirectoryConfig;
pub use directory::{Directory, Joined};
pub use error::SessionError;
