//! Error types for the protocol layer.
//!
//! When you see a `ProtocolError`, the bytes arrived but could not be
//! understood: a broken frame, a bad checksum, or a chat message that
//! does not have the shape its type requires.

/// Errors that can occur while framing or parsing packets and messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The datagram is not a well-formed `kind|sequence|body|checksum` frame.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// The checksum carried by the packet does not match its contents.
    #[error("checksum mismatch: computed {computed}, packet carried {received:?}")]
    ChecksumMismatch {
        /// CRC-32 recomputed over the received header and body.
        computed: u32,
        /// The raw checksum field from the packet.
        received: String,
    },

    /// The packet kind is not one of `start`, `data`, `end`, `ack`.
    #[error("unknown packet kind: {0}")]
    UnknownKind(String),

    /// The application message is empty or structurally invalid.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
