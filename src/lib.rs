//! Feed Arbiter - A/B Market Data Feed Arbitration
//!
//! Determines, for a pair of redundant feeds carrying the same sequenced
//! message stream, which feed delivered each message first. Features include:
//! - Bounds-checked Ethernet/VLAN/IPv4/UDP/trailer frame decoding
//! - Port-based feed classification
//! - Per-sequence earliest-arrival ledger and arbitration summary
//! - Classic pcap capture reading
//! - Drop-reason ingest statistics

pub mod protocol;
pub mod decoder;
pub mod classifier;
pub mod ledger;
pub mod report;
pub mod stats;
pub mod capture;
pub mod config;
pub mod arbiter;

pub use decoder::{FrameDecoder, DecodeError, DecodedRecord, Cursor, Stage};
pub use classifier::{Feed, FeedClassifier};
pub use ledger::{ArbitrationLedger, SideInfo, SequenceEntry};
pub use report::ArbitrationReport;
pub use stats::{IngestStats, DropCounts};
pub use capture::{CaptureSource, CaptureError, NextFrame, RawFrame, PcapReader, PcapWriter};
pub use config::{ArbiterConfig, ConfigError};
pub use arbiter::{Arbiter, ArbiterError, RunSummary, find_capture_files, run_directory};

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the `tracing` subscriber on stderr.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
