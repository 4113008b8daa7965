//! Layered frame decoder
//!
//! Walks Ethernet -> optional VLAN -> IPv4 -> UDP -> trailer over a borrowed
//! slice and returns the sequence number, destination port and trailer
//! timestamp. Every stage takes a `Cursor` by value and hands back the
//! advanced cursor, so each bounds check stays local to the read it guards.
//! Nothing is copied out of the frame except the three decoded fields.

use crate::protocol::*;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt;
use thiserror::Error;

/// Header stage a decode failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ethernet,
    Ipv4,
    Udp,
    Trailer,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Ethernet, Stage::Ipv4, Stage::Udp, Stage::Trailer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ethernet => "ethernet",
            Stage::Ipv4 => "ipv4",
            Stage::Udp => "udp",
            Stage::Trailer => "trailer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("insufficient bytes in {stage} stage: need {need}, have {have}")]
    InsufficientBytes { stage: Stage, need: usize, have: usize },

    #[error("unsupported ethertype: {0:#06x}")]
    UnsupportedEtherType(u16),

    #[error("invalid udp length: {0} is shorter than the udp header")]
    InvalidUdpLength(u16),
}

impl DecodeError {
    /// Stage where decoding stopped
    pub fn stage(&self) -> Stage {
        match self {
            DecodeError::InsufficientBytes { stage, .. } => *stage,
            DecodeError::UnsupportedEtherType(_) => Stage::Ethernet,
            DecodeError::InvalidUdpLength(_) => Stage::Udp,
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Fields recovered from one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedRecord {
    pub sequence: u32,
    pub port: u16,
    pub timestamp_ns: u64,
}

/// Read position over a borrowed frame.
///
/// `Copy`, so advancing produces a new cursor and a failed advance leaves
/// the caller's cursor untouched.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn require(&self, stage: Stage, need: usize) -> DecodeResult<()> {
        let have = self.remaining();
        if have < need {
            return Err(DecodeError::InsufficientBytes { stage, need, have });
        }
        Ok(())
    }

    /// Advance past `n` bytes
    pub fn skip(self, stage: Stage, n: usize) -> DecodeResult<Self> {
        self.require(stage, n)?;
        Ok(Cursor {
            buf: self.buf,
            pos: self.pos + n,
        })
    }

    /// Borrow the next `n` bytes without advancing
    pub fn peek(&self, stage: Stage, n: usize) -> DecodeResult<&'a [u8]> {
        self.require(stage, n)?;
        Ok(&self.buf[self.pos..self.pos + n])
    }

    pub fn read_u16_be(self, stage: Stage) -> DecodeResult<(u16, Self)> {
        let value = BigEndian::read_u16(self.peek(stage, 2)?);
        Ok((value, self.skip(stage, 2)?))
    }
}

/// Destination port and sequence number taken from the UDP stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpFields {
    pub port: u16,
    pub sequence: u32,
}

/// Ethernet II header, with at most one 802.1Q tag.
///
/// Leaves the cursor on the first IPv4 byte: 14 bytes in for untagged
/// frames, 18 for tagged ones.
pub fn parse_ethernet(cur: Cursor<'_>) -> DecodeResult<Cursor<'_>> {
    let cur = cur.skip(Stage::Ethernet, MAC_ADDRS_SIZE)?;
    let (tpid_or_type, cur) = cur.read_u16_be(Stage::Ethernet)?;

    let (ethertype, cur) = if tpid_or_type == ETHERTYPE_VLAN {
        cur.skip(Stage::Ethernet, VLAN_TCI_SIZE)?
            .read_u16_be(Stage::Ethernet)?
    } else {
        (tpid_or_type, cur)
    };

    // A second 0x8100 here (Q-in-Q) is rejected along with ARP and IPv6
    if ethertype != ETHERTYPE_IPV4 {
        return Err(DecodeError::UnsupportedEtherType(ethertype));
    }

    Ok(cur)
}

/// IPv4 header including options. Only IHL is read.
pub fn parse_ipv4(cur: Cursor<'_>) -> DecodeResult<Cursor<'_>> {
    let ihl = cur.peek(Stage::Ipv4, 1)?[0] & IPV4_IHL_MASK;
    cur.skip(Stage::Ipv4, ihl as usize * IPV4_WORD_SIZE)
}

/// UDP header plus payload.
///
/// The sequence number is peeked at the head of the payload, then the whole
/// payload (`length - 8` bytes, sequence included) is skipped so the cursor
/// lands on the trailer. The UDP length is trusted as-is.
pub fn parse_udp(cur: Cursor<'_>) -> DecodeResult<(UdpFields, Cursor<'_>)> {
    let cur = cur.skip(Stage::Udp, UDP_PORT_SIZE)?;
    let (port, cur) = cur.read_u16_be(Stage::Udp)?;
    let (udp_len, cur) = cur.read_u16_be(Stage::Udp)?;
    let cur = cur.skip(Stage::Udp, UDP_CHECKSUM_SIZE)?;

    let sequence = LittleEndian::read_u32(cur.peek(Stage::Udp, SEQUENCE_SIZE)?);

    let payload_len = (udp_len as usize)
        .checked_sub(UDP_HEADER_SIZE)
        .ok_or(DecodeError::InvalidUdpLength(udp_len))?;
    let cur = cur.skip(Stage::Udp, payload_len)?;

    Ok((UdpFields { port, sequence }, cur))
}

/// Capture trailer. Returns the timestamp in nanoseconds.
pub fn parse_trailer(cur: Cursor<'_>) -> DecodeResult<u64> {
    let trailer = cur.peek(Stage::Trailer, TRAILER_SIZE)?;
    let seconds = BigEndian::read_u32(&trailer[TRAILER_SECONDS_OFFSET..TRAILER_SECONDS_OFFSET + 4]);
    let nanos = BigEndian::read_u32(&trailer[TRAILER_NANOS_OFFSET..TRAILER_NANOS_OFFSET + 4]);
    Ok(trailer_timestamp_ns(seconds, nanos))
}

/// Stateless frame decoder
pub struct FrameDecoder;

impl FrameDecoder {
    /// Decode one captured frame.
    ///
    /// Only the first `captured_len` bytes of `bytes` are considered (capped
    /// at the buffer length). All-or-nothing: either every stage succeeds or
    /// the first failure is returned.
    pub fn decode(bytes: &[u8], captured_len: usize) -> DecodeResult<DecodedRecord> {
        let frame = &bytes[..captured_len.min(bytes.len())];

        let cur = parse_ethernet(Cursor::new(frame))?;
        let cur = parse_ipv4(cur)?;
        let (udp, cur) = parse_udp(cur)?;
        let timestamp_ns = parse_trailer(cur)?;

        Ok(DecodedRecord {
            sequence: udp.sequence,
            port: udp.port,
            timestamp_ns,
        })
    }
}
