//! Ingest statistics
//!
//! Counts what happened to every frame pulled from a capture file: recorded
//! against a feed, or dropped and why.

use crate::classifier::Feed;
use crate::decoder::{DecodeError, Stage};
use crate::report::LABEL_WIDTH;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Truncation drops broken down by the stage that ran out of bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub ethernet: u64,
    pub ipv4: u64,
    pub udp: u64,
    pub trailer: u64,
}

impl StageCounts {
    pub fn get(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Ethernet => self.ethernet,
            Stage::Ipv4 => self.ipv4,
            Stage::Udp => self.udp,
            Stage::Trailer => self.trailer,
        }
    }

    fn bump(&mut self, stage: Stage) {
        match stage {
            Stage::Ethernet => self.ethernet += 1,
            Stage::Ipv4 => self.ipv4 += 1,
            Stage::Udp => self.udp += 1,
            Stage::Trailer => self.trailer += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.ethernet + self.ipv4 + self.udp + self.trailer
    }

    fn add(&mut self, other: &StageCounts) {
        self.ethernet += other.ethernet;
        self.ipv4 += other.ipv4;
        self.udp += other.udp;
        self.trailer += other.trailer;
    }
}

/// Frames discarded before reaching the ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub insufficient_bytes: StageCounts,
    pub unsupported_ethertype: u64,
    pub invalid_udp_length: u64,
    pub unclassified_port: u64,
}

impl DropCounts {
    pub fn total(&self) -> u64 {
        self.insufficient_bytes.total()
            + self.unsupported_ethertype
            + self.invalid_udp_length
            + self.unclassified_port
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestStats {
    source: String,
    #[serde(skip)]
    start_time: Option<Instant>,
    frames_read: u64,
    bytes_read: u64,
    recorded_a: u64,
    recorded_b: u64,
    drops: DropCounts,
    timeouts: u64,
    open_failed: bool,
    read_error: Option<String>,
}

impl IngestStats {
    pub fn new(source: impl Into<String>) -> Self {
        IngestStats {
            source: source.into(),
            start_time: None,
            frames_read: 0,
            bytes_read: 0,
            recorded_a: 0,
            recorded_b: 0,
            drops: DropCounts::default(),
            timeouts: 0,
            open_failed: false,
            read_error: None,
        }
    }

    /// Record a frame pulled from the capture source
    pub fn record_frame(&mut self, captured_len: usize) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.frames_read += 1;
        self.bytes_read += captured_len as u64;
    }

    /// Record a frame forwarded to the ledger
    pub fn record_accepted(&mut self, feed: Feed) {
        match feed {
            Feed::A => self.recorded_a += 1,
            Feed::B => self.recorded_b += 1,
        }
    }

    pub fn record_decode_error(&mut self, err: &DecodeError) {
        match err {
            DecodeError::InsufficientBytes { stage, .. } => self.drops.insufficient_bytes.bump(*stage),
            DecodeError::UnsupportedEtherType(_) => self.drops.unsupported_ethertype += 1,
            DecodeError::InvalidUdpLength(_) => self.drops.invalid_udp_length += 1,
        }
    }

    /// Record a decoded frame whose port maps to neither feed
    pub fn record_unclassified(&mut self) {
        self.drops.unclassified_port += 1;
    }

    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    pub fn record_open_failure(&mut self, reason: impl fmt::Display) {
        self.open_failed = true;
        self.read_error = Some(reason.to_string());
    }

    /// Record the error that ended this source's stream early
    pub fn record_read_error(&mut self, reason: impl fmt::Display) {
        self.read_error = Some(reason.to_string());
    }

    /// Fold another source's counters into this one
    pub fn merge(&mut self, other: &IngestStats) {
        self.start_time = match (self.start_time, other.start_time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.frames_read += other.frames_read;
        self.bytes_read += other.bytes_read;
        self.recorded_a += other.recorded_a;
        self.recorded_b += other.recorded_b;
        self.drops.insufficient_bytes.add(&other.drops.insufficient_bytes);
        self.drops.unsupported_ethertype += other.drops.unsupported_ethertype;
        self.drops.invalid_udp_length += other.drops.invalid_udp_length;
        self.drops.unclassified_port += other.drops.unclassified_port;
        self.timeouts += other.timeouts;
    }

    /// Frames per second since the first frame
    pub fn frames_per_sec(&self) -> f64 {
        match self.start_time {
            None => 0.0,
            Some(start) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    self.frames_read as f64 / elapsed
                } else {
                    0.0
                }
            }
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|st| st.elapsed())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn recorded(&self, feed: Feed) -> u64 {
        match feed {
            Feed::A => self.recorded_a,
            Feed::B => self.recorded_b,
        }
    }

    pub fn drops(&self) -> &DropCounts {
        &self.drops
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts
    }

    pub fn open_failed(&self) -> bool {
        self.open_failed
    }

    pub fn read_error(&self) -> Option<&str> {
        self.read_error.as_deref()
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = LABEL_WIDTH;
        writeln!(f, "--- {} ---", self.source)?;
        if self.open_failed {
            return writeln!(f, "{:<w$}{}", "Not opened", self.read_error.as_deref().unwrap_or("unknown"));
        }
        writeln!(f, "{:<w$}{}", "Frames read", self.frames_read)?;
        writeln!(f, "{:<w$}{}", "Recorded A / B", format_args!("{} / {}", self.recorded_a, self.recorded_b))?;
        writeln!(f, "{:<w$}{}", "Dropped", self.drops.total())?;
        for stage in Stage::ALL {
            let count = self.drops.insufficient_bytes.get(stage);
            if count > 0 {
                writeln!(f, "{:<w$}{}", format!("  truncated in {stage}"), count)?;
            }
        }
        if self.drops.unsupported_ethertype > 0 {
            writeln!(f, "{:<w$}{}", "  unsupported ethertype", self.drops.unsupported_ethertype)?;
        }
        if self.drops.invalid_udp_length > 0 {
            writeln!(f, "{:<w$}{}", "  invalid udp length", self.drops.invalid_udp_length)?;
        }
        if self.drops.unclassified_port > 0 {
            writeln!(f, "{:<w$}{}", "  unclassified port", self.drops.unclassified_port)?;
        }
        if let Some(err) = &self.read_error {
            writeln!(f, "{:<w$}{}", "Stopped early", err)?;
        }
        Ok(())
    }
}
