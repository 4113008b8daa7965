//! Capture file reading
//!
//! `CaptureSource` hands out one frame at a time, borrowed from the source's
//! own buffer. `PcapReader` implements it for classic libpcap files
//! (microsecond or nanosecond resolution, either byte order).

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const PCAP_MAGIC_MICROS: u32 = 0xa1b2_c3d4;
pub const PCAP_MAGIC_NANOS: u32 = 0xa1b2_3c4d;
pub const PCAP_GLOBAL_HEADER_SIZE: usize = 24;
pub const PCAP_RECORD_HEADER_SIZE: usize = 16;
pub const LINKTYPE_ETHERNET: u32 = 1;

/// Upper bound on a single record; anything larger is treated as corruption
pub const DEFAULT_MAX_FRAME_BYTES: usize = 256 * 1024;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("not a pcap file: magic {0:#010x}")]
    BadMagic(u32),

    #[error("unsupported link type {0}, only ethernet (1) is decoded")]
    UnsupportedLinkType(u32),

    #[error("truncated {what}: need {need} bytes, have {have}")]
    Truncated {
        what: &'static str,
        need: usize,
        have: usize,
    },

    #[error("oversized record: {len} bytes exceeds limit of {max}")]
    OversizedFrame { len: u32, max: usize },
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// One captured frame, borrowed from the source
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pub data: &'a [u8],
    /// Bytes actually captured; may be less than `wire_len`
    pub captured_len: u32,
    /// Length of the frame on the wire
    pub wire_len: u32,
    pub ts_sec: u32,
    /// Sub-second part, micro- or nanoseconds depending on the file
    pub ts_frac: u32,
}

/// Outcome of one pull from a capture source
#[derive(Debug)]
pub enum NextFrame<'a> {
    Frame(RawFrame<'a>),
    /// Nothing available yet; live sources may return this, files never do
    Timeout,
    EndOfStream,
}

/// Source of raw link-layer frames for one feed file.
///
/// A returned `Err` is fatal for this source: the caller stops pulling and
/// keeps whatever it already ingested.
pub trait CaptureSource {
    fn next_frame(&mut self) -> CaptureResult<NextFrame<'_>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn read_u32(&self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Classic pcap file reader
pub struct PcapReader<R> {
    reader: R,
    endian: Endian,
    nanosecond: bool,
    snaplen: u32,
    link_type: u32,
    max_frame_bytes: usize,
    record: Vec<u8>,
}

impl PcapReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> CaptureResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> PcapReader<R> {
    /// Read and validate the global header
    pub fn new(mut reader: R) -> CaptureResult<Self> {
        let mut header = [0u8; PCAP_GLOBAL_HEADER_SIZE];
        let have = read_full(&mut reader, &mut header)?;
        if have < PCAP_GLOBAL_HEADER_SIZE {
            return Err(CaptureError::Truncated {
                what: "global header",
                need: PCAP_GLOBAL_HEADER_SIZE,
                have,
            });
        }

        let magic = LittleEndian::read_u32(&header[0..4]);
        let (endian, nanosecond) = match magic {
            PCAP_MAGIC_MICROS => (Endian::Little, false),
            PCAP_MAGIC_NANOS => (Endian::Little, true),
            m if m.swap_bytes() == PCAP_MAGIC_MICROS => (Endian::Big, false),
            m if m.swap_bytes() == PCAP_MAGIC_NANOS => (Endian::Big, true),
            m => return Err(CaptureError::BadMagic(m)),
        };

        let snaplen = endian.read_u32(&header[16..20]);
        let link_type = endian.read_u32(&header[20..24]);
        if link_type != LINKTYPE_ETHERNET {
            return Err(CaptureError::UnsupportedLinkType(link_type));
        }

        debug!(?endian, nanosecond, snaplen, "pcap header");

        Ok(PcapReader {
            reader,
            endian,
            nanosecond,
            snaplen,
            link_type,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            record: Vec::new(),
        })
    }

    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// True when record timestamps carry nanoseconds rather than microseconds
    pub fn is_nanosecond(&self) -> bool {
        self.nanosecond
    }

    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    pub fn link_type(&self) -> u32 {
        self.link_type
    }
}

impl<R: Read> CaptureSource for PcapReader<R> {
    fn next_frame(&mut self) -> CaptureResult<NextFrame<'_>> {
        let mut header = [0u8; PCAP_RECORD_HEADER_SIZE];
        let have = read_full(&mut self.reader, &mut header)?;
        if have == 0 {
            return Ok(NextFrame::EndOfStream);
        }
        if have < PCAP_RECORD_HEADER_SIZE {
            return Err(CaptureError::Truncated {
                what: "record header",
                need: PCAP_RECORD_HEADER_SIZE,
                have,
            });
        }

        let ts_sec = self.endian.read_u32(&header[0..4]);
        let ts_frac = self.endian.read_u32(&header[4..8]);
        let incl_len = self.endian.read_u32(&header[8..12]);
        let orig_len = self.endian.read_u32(&header[12..16]);

        let len = incl_len as usize;
        if len > self.max_frame_bytes {
            return Err(CaptureError::OversizedFrame {
                len: incl_len,
                max: self.max_frame_bytes,
            });
        }

        self.record.resize(len, 0);
        let have = read_full(&mut self.reader, &mut self.record)?;
        if have < len {
            return Err(CaptureError::Truncated {
                what: "record body",
                need: len,
                have,
            });
        }

        Ok(NextFrame::Frame(RawFrame {
            data: &self.record,
            captured_len: incl_len,
            wire_len: orig_len,
            ts_sec,
            ts_frac,
        }))
    }
}

/// Classic little-endian microsecond pcap writer
pub struct PcapWriter<W: Write> {
    writer: W,
}

impl PcapWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> PcapWriter<W> {
    pub fn new(mut writer: W) -> io::Result<Self> {
        writer.write_u32::<LittleEndian>(PCAP_MAGIC_MICROS)?;
        writer.write_u16::<LittleEndian>(2)?; // version major
        writer.write_u16::<LittleEndian>(4)?; // version minor
        writer.write_i32::<LittleEndian>(0)?; // thiszone
        writer.write_u32::<LittleEndian>(0)?; // sigfigs
        writer.write_u32::<LittleEndian>(DEFAULT_MAX_FRAME_BYTES as u32)?;
        writer.write_u32::<LittleEndian>(LINKTYPE_ETHERNET)?;
        Ok(PcapWriter { writer })
    }

    pub fn write_frame(&mut self, ts_sec: u32, ts_usec: u32, data: &[u8]) -> io::Result<()> {
        let len = data.len() as u32;
        self.writer.write_u32::<LittleEndian>(ts_sec)?;
        self.writer.write_u32::<LittleEndian>(ts_usec)?;
        self.writer.write_u32::<LittleEndian>(len)?;
        self.writer.write_u32::<LittleEndian>(len)?;
        self.writer.write_all(data)
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn two_frame_file() -> Vec<u8> {
        let mut writer = PcapWriter::new(Vec::new()).unwrap();
        writer.write_frame(1, 10, &[0xaa; 4]).unwrap();
        writer.write_frame(2, 20, &[0xbb; 6]).unwrap();
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_read_written_frames() {
        let mut reader = PcapReader::new(Cursor::new(two_frame_file())).unwrap();
        assert!(!reader.is_nanosecond());
        assert_eq!(reader.link_type(), LINKTYPE_ETHERNET);

        match reader.next_frame().unwrap() {
            NextFrame::Frame(frame) => {
                assert_eq!(frame.data, &[0xaa; 4]);
                assert_eq!(frame.captured_len, 4);
                assert_eq!(frame.ts_sec, 1);
                assert_eq!(frame.ts_frac, 10);
            }
            other => panic!("expected frame, got {:?}", other),
        }
        match reader.next_frame().unwrap() {
            NextFrame::Frame(frame) => assert_eq!(frame.data.len(), 6),
            other => panic!("expected frame, got {:?}", other),
        }
        assert!(matches!(reader.next_frame().unwrap(), NextFrame::EndOfStream));
    }

    #[test]
    fn test_big_endian_nanosecond_header() {
        let mut file = Vec::new();
        file.write_u32::<BigEndian>(PCAP_MAGIC_NANOS).unwrap();
        file.write_u16::<BigEndian>(2).unwrap();
        file.write_u16::<BigEndian>(4).unwrap();
        file.write_i32::<BigEndian>(0).unwrap();
        file.write_u32::<BigEndian>(0).unwrap();
        file.write_u32::<BigEndian>(65535).unwrap();
        file.write_u32::<BigEndian>(LINKTYPE_ETHERNET).unwrap();
        file.write_u32::<BigEndian>(7).unwrap();
        file.write_u32::<BigEndian>(999).unwrap();
        file.write_u32::<BigEndian>(2).unwrap();
        file.write_u32::<BigEndian>(60).unwrap();
        file.extend_from_slice(&[1, 2]);

        let mut reader = PcapReader::new(Cursor::new(file)).unwrap();
        assert!(reader.is_nanosecond());
        assert_eq!(reader.snaplen(), 65535);
        match reader.next_frame().unwrap() {
            NextFrame::Frame(frame) => {
                assert_eq!(frame.data, &[1, 2]);
                assert_eq!(frame.wire_len, 60);
                assert_eq!(frame.ts_frac, 999);
            }
            other => panic!("expected frame, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_magic() {
        let result = PcapReader::new(Cursor::new(vec![0u8; 24]));
        assert!(matches!(result, Err(CaptureError::BadMagic(0))));
    }

    #[test]
    fn test_empty_file() {
        let result = PcapReader::new(Cursor::new(Vec::new()));
        assert!(matches!(result, Err(CaptureError::Truncated { have: 0, .. })));
    }

    #[test]
    fn test_truncated_record_body() {
        let mut file = two_frame_file();
        file.truncate(file.len() - 3);
        let mut reader = PcapReader::new(Cursor::new(file)).unwrap();
        assert!(matches!(reader.next_frame(), Ok(NextFrame::Frame(_))));
        assert!(matches!(
            reader.next_frame(),
            Err(CaptureError::Truncated { what: "record body", need: 6, have: 3 })
        ));
    }

    #[test]
    fn test_oversized_record() {
        let mut reader = PcapReader::new(Cursor::new(two_frame_file()))
            .unwrap()
            .with_max_frame_bytes(5);
        assert!(matches!(reader.next_frame(), Ok(NextFrame::Frame(_))));
        assert!(matches!(
            reader.next_frame(),
            Err(CaptureError::OversizedFrame { len: 6, max: 5 })
        ));
    }

    #[test]
    fn test_non_ethernet_link_type() {
        let mut file = two_frame_file();
        LittleEndian::write_u32(&mut file[20..24], 101);
        let result = PcapReader::new(Cursor::new(file));
        assert!(matches!(result, Err(CaptureError::UnsupportedLinkType(101))));
    }
}
