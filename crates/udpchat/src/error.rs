//! Unified error type for udpchat.

use udpchat_protocol::ProtocolError;
use udpchat_session::SessionError;
use udpchat_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attributes let `?` convert sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Binding, sending, or delivery failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A packet or application message could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The directory refused a join.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Console input or output failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
