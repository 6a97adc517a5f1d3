//! Wire protocol for udpchat.
//!
//! This crate defines the two text formats that travel over the network,
//! one nested inside the other:
//!
//! - **Packets** ([`Packet`], [`PacketKind`]): one UDP datagram, framed as
//!   `kind|sequence|body|checksum` with a CRC-32 over everything up to and
//!   including the last pipe.
//! - **Application messages** ([`AppMessage`], [`MessageType`]): the
//!   space-delimited `type length content...` strings that the chat layer
//!   exchanges. A message is split into chunks ([`split_into_chunks`]) and
//!   each chunk becomes the body of one DATA packet.
//!
//! Everything here is pure: no sockets, no clocks, no shared state.
//!
//! ```text
//! Transport (datagrams) → Protocol (Packet / AppMessage) → Router (chat semantics)
//! ```

mod chunk;
mod error;
mod message;
mod packet;

pub use chunk::{chunk_count, estimated_size, split_into_chunks};
pub use error::ProtocolError;
pub use message::{
    encode_message, AppMessage, ForwardedMessage, MessageFormat, MessageType,
    SendRequest,
};
pub use packet::{checksum, frame, validate, Packet, PacketKind};

/// Maximum number of users the server keeps in its directory at once.
pub const MAX_CLIENTS: usize = 10;

/// Maximum number of recipients a single `send_message` may name.
pub const MAX_RECIPIENTS: usize = 10;

/// Chunk budget in bytes used to size DATA packets.
pub const CHUNK_SIZE: usize = 1400;

/// Size of the datagram receive buffer.
pub const RECV_BUFFER_SIZE: usize = 4096;
