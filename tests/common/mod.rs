//! Synthetic frame construction shared by the integration tests

#![allow(dead_code)]

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

pub const PORT_A: u16 = 14310;
pub const PORT_B: u16 = 15310;

#[derive(Debug, Clone, Copy)]
pub struct FrameSpec {
    pub port: u16,
    pub sequence: u32,
    pub seconds: u32,
    pub nanos: u32,
    pub vlan: bool,
    /// IPv4 option bytes, must be a multiple of 4
    pub ip_options: usize,
    /// Payload bytes after the sequence number
    pub payload_extra: usize,
    pub ethertype: u16,
}

impl Default for FrameSpec {
    fn default() -> Self {
        FrameSpec {
            port: PORT_A,
            sequence: 1,
            seconds: 0,
            nanos: 0,
            vlan: false,
            ip_options: 0,
            payload_extra: 0,
            ethertype: 0x0800,
        }
    }
}

pub fn build_frame(spec: &FrameSpec) -> Vec<u8> {
    let mut f = Vec::with_capacity(128);

    // Ethernet
    f.extend_from_slice(&[0x01; 6]);
    f.extend_from_slice(&[0x02; 6]);
    if spec.vlan {
        f.write_u16::<BigEndian>(0x8100).unwrap();
        f.write_u16::<BigEndian>(0x0001).unwrap();
    }
    f.write_u16::<BigEndian>(spec.ethertype).unwrap();

    // IPv4
    let ip_header_len = 20 + spec.ip_options;
    let udp_len = 8 + 4 + spec.payload_extra;
    f.push(0x40 | (ip_header_len / 4) as u8);
    f.push(0x00);
    f.write_u16::<BigEndian>((ip_header_len + udp_len) as u16).unwrap();
    f.write_u16::<BigEndian>(0x1234).unwrap();
    f.write_u16::<BigEndian>(0x0000).unwrap();
    f.push(32); // ttl
    f.push(17); // udp
    f.write_u16::<BigEndian>(0).unwrap();
    f.write_u32::<BigEndian>(0x0a00_0001).unwrap();
    f.write_u32::<BigEndian>(0xe000_0001).unwrap();
    f.extend(std::iter::repeat(0x05).take(spec.ip_options));

    // UDP
    f.write_u16::<BigEndian>(8010).unwrap();
    f.write_u16::<BigEndian>(spec.port).unwrap();
    f.write_u16::<BigEndian>(udp_len as u16).unwrap();
    f.write_u16::<BigEndian>(0).unwrap();
    f.write_u32::<LittleEndian>(spec.sequence).unwrap();
    f.extend(std::iter::repeat(0xee).take(spec.payload_extra));

    // Trailer
    f.extend_from_slice(&[0x01; 8]);
    f.write_u32::<BigEndian>(spec.seconds).unwrap();
    f.write_u32::<BigEndian>(spec.nanos).unwrap();
    f.extend_from_slice(&[0x02; 4]);

    f
}

/// Frame on `port` carrying `sequence`, stamped at `ts_ns`
pub fn frame_at(port: u16, sequence: u32, ts_ns: u64) -> Vec<u8> {
    build_frame(&FrameSpec {
        port,
        sequence,
        seconds: (ts_ns / 1_000_000_000) as u32,
        nanos: (ts_ns % 1_000_000_000) as u32,
        ..FrameSpec::default()
    })
}
