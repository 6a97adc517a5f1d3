//! Receive-side state: sequence gating and reassembly, per source.
//!
//! The table is owned by the endpoint actor, so it is a plain `HashMap`
//! with no locking. Each call to [`ReceiveTable::on_packet`] returns what
//! to acknowledge and, on a matching END, the reassembled message.

use std::collections::HashMap;
use std::net::SocketAddr;

use tracing::debug;
use udpchat_protocol::{Packet, PacketKind};

/// Reception state for one in-progress transfer.
#[derive(Debug, Default)]
struct Reception {
    /// Next DATA (or END) sequence this source must send.
    expected: u64,
    /// DATA bodies accepted so far, in sequence order.
    chunks: Vec<String>,
}

/// What the endpoint should do after a packet was absorbed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReceiveOutcome {
    /// Send `ACK(seq)` back to the source.
    pub ack: Option<u64>,
    /// A complete message to hand to the application.
    pub delivered: Option<String>,
}

/// Per-source reception state for every peer sending to this endpoint.
#[derive(Debug, Default)]
pub struct ReceiveTable {
    active: HashMap<SocketAddr, Reception>,
    /// END sequence of the last transfer completed per source, so a
    /// retransmitted END (our ACK was lost) can be re-acknowledged.
    completed: HashMap<SocketAddr, u64>,
}

impl ReceiveTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorbs a checksum-validated START, DATA, or END packet.
    ///
    /// ACK packets belong to the send side and produce an empty outcome.
    pub fn on_packet(&mut self, from: SocketAddr, packet: &Packet) -> ReceiveOutcome {
        match packet.kind {
            PacketKind::Start => self.on_start(from, packet.sequence),
            PacketKind::Data => self.on_data(from, packet.sequence, &packet.body),
            PacketKind::End => self.on_end(from, packet.sequence),
            PacketKind::Ack => ReceiveOutcome::default(),
        }
    }

    fn on_start(&mut self, from: SocketAddr, sequence: u64) -> ReceiveOutcome {
        let expected = sequence.wrapping_add(1);
        self.completed.remove(&from);
        self.active.insert(
            from,
            Reception {
                expected,
                chunks: Vec::new(),
            },
        );
        debug!(%from, base = sequence, "transfer started");
        ReceiveOutcome {
            ack: Some(expected),
            delivered: None,
        }
    }

    fn on_data(&mut self, from: SocketAddr, sequence: u64, body: &str) -> ReceiveOutcome {
        let Some(reception) = self.active.get_mut(&from) else {
            debug!(%from, sequence, "DATA without a transfer, dropping");
            return ReceiveOutcome::default();
        };
        if sequence == reception.expected {
            reception.chunks.push(body.to_string());
            reception.expected = reception.expected.wrapping_add(1);
        }
        // Duplicates and gaps are answered with the current expectation.
        ReceiveOutcome {
            ack: Some(reception.expected),
            delivered: None,
        }
    }

    fn on_end(&mut self, from: SocketAddr, sequence: u64) -> ReceiveOutcome {
        match self.expected(&from) {
            Some(expected) if expected == sequence => {
                let reception = self.active.remove(&from).unwrap_or_default();
                self.completed.insert(from, sequence);
                let payload = reception.chunks.concat();
                debug!(%from, len = payload.len(), "transfer complete");
                ReceiveOutcome {
                    ack: Some(sequence.wrapping_add(1)),
                    delivered: Some(payload),
                }
            }
            Some(expected) => ReceiveOutcome {
                ack: Some(expected),
                delivered: None,
            },
            None if self.completed.get(&from) == Some(&sequence) => ReceiveOutcome {
                ack: Some(sequence.wrapping_add(1)),
                delivered: None,
            },
            None => {
                debug!(%from, sequence, "END without a transfer, dropping");
                ReceiveOutcome::default()
            }
        }
    }

    /// The next sequence expected from `from`, if a transfer is open.
    pub fn expected(&self, from: &SocketAddr) -> Option<u64> {
        self.active.get(from).map(|r| r.expected)
    }

    /// Number of DATA chunks buffered for `from`.
    pub fn buffered(&self, from: &SocketAddr) -> usize {
        self.active.get(from).map_or(0, |r| r.chunks.len())
    }

    /// Drops all state for `from`.
    pub fn forget(&mut self, from: &SocketAddr) {
        self.active.remove(from);
        self.completed.remove(from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use udpchat_protocol::split_into_chunks;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn start(seq: u64) -> Packet {
        Packet::new(PacketKind::Start, seq, "")
    }

    fn data(seq: u64, body: &str) -> Packet {
        Packet::new(PacketKind::Data, seq, body)
    }

    fn end(seq: u64) -> Packet {
        Packet::new(PacketKind::End, seq, "")
    }

    #[test]
    fn test_start_acks_next_sequence() {
        let mut table = ReceiveTable::new();
        let out = table.on_packet(addr(1), &start(500));

        assert_eq!(out.ack, Some(501));
        assert_eq!(out.delivered, None);
        assert_eq!(table.expected(&addr(1)), Some(501));
    }

    #[test]
    fn test_lossless_run_reassembles_message() {
        let message = "w".repeat(4000);
        let chunks = split_into_chunks(&message, 1400);
        let mut table = ReceiveTable::new();
        let from = addr(1);

        table.on_packet(from, &start(10));
        for (i, chunk) in chunks.iter().enumerate() {
            let out = table.on_packet(from, &data(11 + i as u64, chunk));
            assert_eq!(out.ack, Some(12 + i as u64));
        }
        let end_seq = 11 + chunks.len() as u64;
        let out = table.on_packet(from, &end(end_seq));

        assert_eq!(out.ack, Some(end_seq + 1));
        assert_eq!(out.delivered.as_deref(), Some(message.as_str()));
        assert_eq!(table.expected(&from), None, "state torn down after END");
    }

    #[test]
    fn test_duplicate_data_is_reacked_without_buffering() {
        let mut table = ReceiveTable::new();
        let from = addr(1);
        table.on_packet(from, &start(10));
        table.on_packet(from, &data(11, "a"));

        let out = table.on_packet(from, &data(11, "a"));

        assert_eq!(out.ack, Some(12));
        assert_eq!(table.expected(&from), Some(12));
        assert_eq!(table.buffered(&from), 1);
    }

    #[test]
    fn test_out_of_order_data_reprompts_for_expected() {
        let mut table = ReceiveTable::new();
        let from = addr(1);
        table.on_packet(from, &start(10));

        let out = table.on_packet(from, &data(13, "future"));

        assert_eq!(out.ack, Some(11));
        assert_eq!(table.buffered(&from), 0);
    }

    #[test]
    fn test_early_end_is_not_delivered() {
        let mut table = ReceiveTable::new();
        let from = addr(1);
        table.on_packet(from, &start(10));
        table.on_packet(from, &data(11, "a"));

        // Sender thinks there were two chunks; we only have one.
        let out = table.on_packet(from, &end(13));

        assert_eq!(out.ack, Some(12));
        assert_eq!(out.delivered, None);
        assert_eq!(table.buffered(&from), 1);
    }

    #[test]
    fn test_new_start_discards_partial_transfer() {
        let mut table = ReceiveTable::new();
        let from = addr(1);
        table.on_packet(from, &start(10));
        table.on_packet(from, &data(11, "stale"));

        table.on_packet(from, &start(900));
        table.on_packet(from, &data(901, "fresh"));
        let out = table.on_packet(from, &end(902));

        assert_eq!(out.delivered.as_deref(), Some("fresh"));
    }

    #[test]
    fn test_retransmitted_end_is_reacked_once_delivered() {
        let mut table = ReceiveTable::new();
        let from = addr(1);
        table.on_packet(from, &start(10));
        table.on_packet(from, &data(11, "x"));
        let first = table.on_packet(from, &end(12));
        assert!(first.delivered.is_some());

        let again = table.on_packet(from, &end(12));

        assert_eq!(again.ack, Some(13));
        assert_eq!(again.delivered, None, "must not deliver twice");
    }

    #[test]
    fn test_data_without_start_is_dropped() {
        let mut table = ReceiveTable::new();
        let out = table.on_packet(addr(1), &data(11, "orphan"));
        assert_eq!(out, ReceiveOutcome::default());
    }

    #[test]
    fn test_sources_are_independent() {
        let mut table = ReceiveTable::new();
        table.on_packet(addr(1), &start(10));
        table.on_packet(addr(2), &start(70));
        table.on_packet(addr(1), &data(11, "one"));
        table.on_packet(addr(2), &data(71, "two"));

        let one = table.on_packet(addr(1), &end(12));
        let two = table.on_packet(addr(2), &end(72));

        assert_eq!(one.delivered.as_deref(), Some("one"));
        assert_eq!(two.delivered.as_deref(), Some("two"));
    }

    #[test]
    fn test_forget_clears_source() {
        let mut table = ReceiveTable::new();
        table.on_packet(addr(1), &start(10));
        table.forget(&addr(1));
        assert_eq!(table.expected(&addr(1)), None);
    }
}
