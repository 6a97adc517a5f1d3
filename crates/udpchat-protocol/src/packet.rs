//! Packet framing and checksums.
//!
//! Every datagram on the wire is ASCII/UTF-8 text of the form
//!
//! ```text
//! <kind>|<sequence>|<body>|<checksum>
//! ```
//!
//! where `checksum` is the decimal CRC-32 of the bytes `kind|sequence|body|`
//! (trailing pipe included). The body may itself contain pipes: the kind and
//! sequence are always the first two fields and the checksum is always the
//! last, so everything in between is the body.

use std::fmt;
use std::str::FromStr;

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::ProtocolError;

/// The zlib/`binascii.crc32` polynomial.
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Body carried by every ACK packet: a zero-length `ack` message.
const ACK_BODY: &str = "ack 0";

// ---------------------------------------------------------------------------
// PacketKind
// ---------------------------------------------------------------------------

/// The control kind of a packet.
///
/// A transfer is always `Start`, zero or more `Data`, then `End`. The
/// receiving side answers each of them with an `Ack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Opens a transfer. Its sequence number is the transfer's base.
    Start,
    /// Carries one chunk of the message.
    Data,
    /// Closes a transfer; the receiver reassembles on a matching END.
    End,
    /// Acknowledgement. The sequence is the next number the receiver expects.
    Ack,
}

impl PacketKind {
    /// Returns the lowercase wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Data => "data",
            Self::End => "end",
            Self::Ack => "ack",
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PacketKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "data" => Ok(Self::Data),
            "end" => Ok(Self::End),
            "ack" => Ok(Self::Ack),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Computes the CRC-32 of `bytes`.
pub fn checksum(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}

/// Frames a packet: `"<kind>|<sequence>|<body>|<checksum>"`.
pub fn frame(kind: PacketKind, sequence: u64, body: &str) -> String {
    let mut packet = header(kind, sequence, body);
    let sum = checksum(packet.as_bytes());
    packet.push_str(&sum.to_string());
    packet
}

/// Returns `true` if the trailing checksum field matches the CRC-32 of
/// everything before it (including the final pipe).
pub fn validate(raw: &str) -> bool {
    match raw.rfind('|') {
        Some(idx) => {
            let (covered, field) = raw.split_at(idx + 1);
            checksum(covered.as_bytes()).to_string() == field
        }
        None => false,
    }
}

/// Everything the checksum covers: `kind|sequence|body|`.
fn header(kind: PacketKind, sequence: u64, body: &str) -> String {
    format!("{kind}|{sequence}|{body}|")
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// A parsed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Control kind.
    pub kind: PacketKind,
    /// Sequence number within the transfer.
    pub sequence: u64,
    /// Payload text. Empty for START and END.
    pub body: String,
    /// CRC-32 carried on the wire.
    pub checksum: u32,
}

impl Packet {
    /// Builds a packet and computes its checksum.
    pub fn new(kind: PacketKind, sequence: u64, body: impl Into<String>) -> Self {
        let body = body.into();
        let checksum = checksum(header(kind, sequence, &body).as_bytes());
        Self {
            kind,
            sequence,
            body,
            checksum,
        }
    }

    /// An ACK asking the peer for `sequence` next.
    pub fn ack(sequence: u64) -> Self {
        Self::new(PacketKind::Ack, sequence, ACK_BODY)
    }

    /// Renders the packet in wire format.
    pub fn frame(&self) -> String {
        let mut packet = header(self.kind, self.sequence, &self.body);
        packet.push_str(&self.checksum.to_string());
        packet
    }

    /// Splits a frame into its fields without checking the checksum.
    ///
    /// # Errors
    /// - [`ProtocolError::MalformedPacket`] if there are fewer than four
    ///   fields or a numeric field does not parse.
    /// - [`ProtocolError::UnknownKind`] for an unrecognised kind.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let mut head = raw.splitn(3, '|');
        let (kind, sequence, rest) = match (head.next(), head.next(), head.next()) {
            (Some(kind), Some(sequence), Some(rest)) => (kind, sequence, rest),
            _ => {
                return Err(ProtocolError::MalformedPacket(format!(
                    "expected 4 fields in {raw:?}"
                )));
            }
        };
        let (body, sum) = rest.rsplit_once('|').ok_or_else(|| {
            ProtocolError::MalformedPacket(format!("missing checksum in {raw:?}"))
        })?;

        let kind: PacketKind = kind.parse()?;
        let sequence = sequence.parse::<u64>().map_err(|_| {
            ProtocolError::MalformedPacket(format!("bad sequence number {sequence:?}"))
        })?;
        let checksum = sum.parse::<u32>().map_err(|_| {
            ProtocolError::MalformedPacket(format!("bad checksum field {sum:?}"))
        })?;

        Ok(Self {
            kind,
            sequence,
            body: body.to_string(),
            checksum,
        })
    }

    /// Decodes a received datagram: UTF-8, checksum, then fields.
    ///
    /// This is what receivers call before trusting a packet.
    pub fn decode(datagram: &[u8]) -> Result<Self, ProtocolError> {
        let raw = std::str::from_utf8(datagram).map_err(|e| {
            ProtocolError::MalformedPacket(format!("not valid UTF-8: {e}"))
        })?;
        if !validate(raw) {
            let received = raw.rsplit('|').next().unwrap_or_default().to_string();
            let covered = raw.len() - received.len();
            return Err(ProtocolError::ChecksumMismatch {
                computed: checksum(&raw.as_bytes()[..covered]),
                received,
            });
        }
        Self::parse(raw)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_matches_standard_crc32_check_value() {
        // The CRC-32 "check" value for the ASCII digits 1..9.
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_frame_layout_has_trailing_checksum() {
        let framed = frame(PacketKind::Data, 7, "hello");
        let expected_sum = checksum(b"data|7|hello|");
        assert_eq!(framed, format!("data|7|hello|{expected_sum}"));
    }

    #[test]
    fn test_parse_frame_returns_all_fields() {
        let framed = frame(PacketKind::Start, 42, "");
        let packet = Packet::parse(&framed).unwrap();

        assert_eq!(packet.kind, PacketKind::Start);
        assert_eq!(packet.sequence, 42);
        assert_eq!(packet.body, "");
        assert_eq!(packet.checksum, checksum(b"start|42||"));
    }

    #[test]
    fn test_parse_body_with_pipes_is_rejoined() {
        let framed = frame(PacketKind::Data, 3, "a|b||c");
        let packet = Packet::parse(&framed).unwrap();
        assert_eq!(packet.body, "a|b||c");
        assert!(validate(&framed));
    }

    #[test]
    fn test_packet_new_matches_free_frame() {
        let packet = Packet::new(PacketKind::End, 99, "");
        assert_eq!(packet.frame(), frame(PacketKind::End, 99, ""));
    }

    #[test]
    fn test_ack_carries_zero_length_message_body() {
        let ack = Packet::ack(12);
        assert_eq!(ack.kind, PacketKind::Ack);
        assert_eq!(ack.sequence, 12);
        assert_eq!(ack.body, "ack 0");
    }

    #[test]
    fn test_validate_detects_every_single_byte_mutation() {
        let framed = frame(PacketKind::Data, 1001, "send_message 7 1 bob hi");
        let bytes = framed.as_bytes();

        for i in 0..bytes.len() {
            let mut mutated = bytes.to_vec();
            // Flip one bit; stay in ASCII so the string is still UTF-8.
            mutated[i] ^= 0x01;
            let Ok(text) = std::str::from_utf8(&mutated) else {
                continue;
            };
            assert!(!validate(text), "mutation at byte {i} went undetected");
        }
    }

    #[test]
    fn test_validate_without_pipe_is_false() {
        assert!(!validate("garbage"));
        assert!(!validate(""));
    }

    #[test]
    fn test_parse_too_few_fields_is_malformed() {
        let result = Packet::parse("data|1");
        assert!(matches!(result, Err(ProtocolError::MalformedPacket(_))));
    }

    #[test]
    fn test_parse_unknown_kind_is_rejected() {
        let result = Packet::parse("nack|1||123");
        assert!(matches!(result, Err(ProtocolError::UnknownKind(k)) if k == "nack"));
    }

    #[test]
    fn test_parse_non_numeric_sequence_is_malformed() {
        let result = Packet::parse("data|x|body|123");
        assert!(matches!(result, Err(ProtocolError::MalformedPacket(_))));
    }

    #[test]
    fn test_decode_valid_datagram() {
        let framed = frame(PacketKind::Data, 5, "join 5 alice");
        let packet = Packet::decode(framed.as_bytes()).unwrap();
        assert_eq!(packet.body, "join 5 alice");
    }

    #[test]
    fn test_decode_corrupted_datagram_reports_mismatch() {
        let framed = frame(PacketKind::Data, 5, "join 5 alice");
        let corrupted = framed.replacen("alice", "alicf", 1);

        let result = Packet::decode(corrupted.as_bytes());
        assert!(matches!(result, Err(ProtocolError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_decode_invalid_utf8_is_malformed() {
        let result = Packet::decode(&[0xff, 0xfe, b'|']);
        assert!(matches!(result, Err(ProtocolError::MalformedPacket(_))));
    }

    #[test]
    fn test_packet_kind_round_trips_through_str() {
        for kind in [
            PacketKind::Start,
            PacketKind::Data,
            PacketKind::End,
            PacketKind::Ack,
        ] {
            assert_eq!(kind.as_str().parse::<PacketKind>().unwrap(), kind);
        }
    }
}
