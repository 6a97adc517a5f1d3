//! Error types for the directory.

/// Reasons a `join` is refused.
///
/// Both are reported back to the client as an `err_*` message; neither
/// creates a directory entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The directory already holds `max_clients` entries.
    #[error("server full ({capacity} clients)")]
    ServerFull {
        /// The configured capacity.
        capacity: usize,
    },

    /// Another endpoint already holds this username.
    #[error("username {0:?} is not available")]
    UsernameUnavailable(String),
}
