//! Send-side state for one outbound message.
//!
//! [`Transfer`] knows which packet is due and which ACK releases it. It
//! does **not** touch the socket or the clock; the peer actor resends
//! [`Transfer::current_packet`] on every timeout and feeds every ACK it
//! sees into [`Transfer::on_ack`].
//!
//! # Stop-and-wait contract
//!
//! With base sequence `S` and `N` chunks:
//!
//! ```text
//! phase            packet on the wire       released by
//! AwaitStartAck    START(S)                 ACK(S+1)
//! SendingData(i)   DATA(S+1+i, chunk_i)     ACK(S+2+i)
//! AwaitEndAck      END(S+N+1)               ACK(S+N+2)
//! Idle             -                        -
//! ```
//!
//! Exactly one packet is unacknowledged at any moment.

use udpchat_protocol::{split_into_chunks, Packet, PacketKind};

/// Where a transfer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderPhase {
    /// START sent, waiting for `S+1`.
    AwaitStartAck,
    /// DATA for chunk `index` sent, waiting for `S+2+index`.
    SendingData {
        /// Zero-based chunk index.
        index: usize,
    },
    /// END sent, waiting for `S+N+2`.
    AwaitEndAck,
    /// END acknowledged; nothing left to send.
    Idle,
}

/// One message being pushed through the stop-and-wait sequence.
#[derive(Debug, Clone)]
pub struct Transfer {
    base: u64,
    chunks: Vec<String>,
    phase: SenderPhase,
}

impl Transfer {
    /// Chunks `payload` with `chunk_size` and starts at `AwaitStartAck`.
    pub fn new(base: u64, payload: &str, chunk_size: usize) -> Self {
        Self {
            base,
            chunks: split_into_chunks(payload, chunk_size),
            phase: SenderPhase::AwaitStartAck,
        }
    }

    /// The START sequence number.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Number of DATA packets in this transfer.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Current phase.
    pub fn phase(&self) -> SenderPhase {
        self.phase
    }

    /// `true` once END has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.phase == SenderPhase::Idle
    }

    fn end_sequence(&self) -> u64 {
        self.base.wrapping_add(self.chunks.len() as u64).wrapping_add(1)
    }

    /// The packet that should be on the wire right now.
    pub fn current_packet(&self) -> Option<Packet> {
        match self.phase {
            SenderPhase::AwaitStartAck => Some(Packet::new(PacketKind::Start, self.base, "")),
            SenderPhase::SendingData { index } => Some(Packet::new(
                PacketKind::Data,
                self.base.wrapping_add(1).wrapping_add(index as u64),
                self.chunks[index].as_str(),
            )),
            SenderPhase::AwaitEndAck => {
                Some(Packet::new(PacketKind::End, self.end_sequence(), ""))
            }
            SenderPhase::Idle => None,
        }
    }

    /// The ACK sequence that releases the current packet.
    pub fn expected_ack(&self) -> Option<u64> {
        self.current_packet().map(|p| p.sequence.wrapping_add(1))
    }

    /// Feeds an observed ACK. Returns `true` if it advanced the phase.
    ///
    /// ACKs for any other sequence (stale, duplicate, or re-prompts for a
    /// chunk already in flight) leave the transfer unchanged.
    pub fn on_ack(&mut self, sequence: u64) -> bool {
        if self.expected_ack() != Some(sequence) {
            return false;
        }
        self.phase = match self.phase {
            SenderPhase::AwaitStartAck if self.chunks.is_empty() => SenderPhase::AwaitEndAck,
            SenderPhase::AwaitStartAck => SenderPhase::SendingData { index: 0 },
            SenderPhase::SendingData { index } if index + 1 < self.chunks.len() => {
                SenderPhase::SendingData { index: index + 1 }
            }
            SenderPhase::SendingData { .. } => SenderPhase::AwaitEndAck,
            SenderPhase::AwaitEndAck | SenderPhase::Idle => SenderPhase::Idle,
        };
        true
    }
}
