//! Transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use udpchat_protocol::{CHUNK_SIZE, RECV_BUFFER_SIZE};

/// Tuning knobs for a [`ReliableEndpoint`](crate::ReliableEndpoint).
///
/// Every field has a default, so a JSON config file only needs the
/// fields it wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// How long to wait for an ACK before resending a packet, in milliseconds.
    pub retransmit_timeout_ms: u64,

    /// How many times one packet may be resent before the whole transfer
    /// fails with [`TransportError::DeliveryFailed`](crate::TransportError).
    ///
    /// `None` retries forever.
    pub max_retransmissions: Option<u32>,

    /// Chunk budget in bytes used to size DATA packets.
    pub chunk_size: usize,

    /// Size of the datagram receive buffer.
    pub recv_buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            retransmit_timeout_ms: 500,
            max_retransmissions: Some(20),
            chunk_size: CHUNK_SIZE,
            recv_buffer_size: RECV_BUFFER_SIZE,
        }
    }
}

impl TransportConfig {
    /// The retransmission timeout as a [`Duration`].
    pub fn retransmit_timeout(&self) -> Duration {
        Duration::from_millis(self.retransmit_timeout_ms)
    }
}
