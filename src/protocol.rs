//! Wire layout of a captured feed frame
//!
//! Ethernet II, optionally 802.1Q tagged:
//!   - dst mac: 6 bytes
//!   - src mac: 6 bytes
//!   - [tpid 0x8100: 2 bytes][tci: 2 bytes] (tagged frames only)
//!   - ethertype: u16 big-endian, must be IPv4
//!
//! IPv4: low nibble of the first byte is the header length in 32-bit words.
//!
//! UDP: src port, dst port, length, checksum (all u16 big-endian), followed
//! by the application payload. The first 4 payload bytes hold the message
//! sequence number, little-endian.
//!
//! Trailer: 20 bytes appended by the capture appliance after the UDP payload.
//!   - bytes 0..8: not interpreted
//!   - bytes 8..12: seconds, u32 big-endian
//!   - bytes 12..16: nanoseconds, u32 big-endian
//!   - bytes 16..20: not interpreted

pub const MAC_ADDRS_SIZE: usize = 12;
pub const ETHERTYPE_SIZE: usize = 2;
pub const VLAN_TCI_SIZE: usize = 2;

/// Untagged Ethernet header: two MACs plus EtherType
pub const ETHERNET_HEADER_SIZE: usize = MAC_ADDRS_SIZE + ETHERTYPE_SIZE;

/// Tagged Ethernet header: two MACs, TPID, TCI, EtherType
pub const ETHERNET_VLAN_HEADER_SIZE: usize = ETHERNET_HEADER_SIZE + 2 + VLAN_TCI_SIZE;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_VLAN: u16 = 0x8100;

/// IHL counts 32-bit words
pub const IPV4_WORD_SIZE: usize = 4;
pub const IPV4_IHL_MASK: u8 = 0x0F;
pub const IPV4_MIN_HEADER_SIZE: usize = 20;

pub const UDP_PORT_SIZE: usize = 2;
pub const UDP_LENGTH_SIZE: usize = 2;
pub const UDP_CHECKSUM_SIZE: usize = 2;
pub const UDP_HEADER_SIZE: usize = 2 * UDP_PORT_SIZE + UDP_LENGTH_SIZE + UDP_CHECKSUM_SIZE;

/// Sequence number at the head of every payload
pub const SEQUENCE_SIZE: usize = 4;

pub const TRAILER_SIZE: usize = 20;
pub const TRAILER_SECONDS_OFFSET: usize = 8;
pub const TRAILER_NANOS_OFFSET: usize = 12;

pub const NANOS_PER_SEC: u64 = 1_000_000_000;

// Compile-time assertions for header layout
const _: () = {
    assert!(ETHERNET_HEADER_SIZE == 14);
    assert!(ETHERNET_VLAN_HEADER_SIZE == 18);
    assert!(UDP_HEADER_SIZE == 8);
    assert!(TRAILER_NANOS_OFFSET + 4 <= TRAILER_SIZE);
};

/// Combine the trailer's split timestamp into nanoseconds since the epoch.
///
/// Cannot overflow: `u32::MAX * 1e9 + u32::MAX` fits in a u64.
pub fn trailer_timestamp_ns(seconds: u32, nanoseconds: u32) -> u64 {
    seconds as u64 * NANOS_PER_SEC + nanoseconds as u64
}
