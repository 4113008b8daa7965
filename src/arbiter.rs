//! Capture ingest pipeline
//!
//! Drains each feed's capture file through the decoder and classifier into a
//! single ledger, then summarizes. One `Arbiter` owns the ledger; files are
//! drained one after the other.

use crate::capture::{CaptureSource, NextFrame, PcapReader};
use crate::classifier::{Feed, FeedClassifier};
use crate::config::{ArbiterConfig, ConfigError};
use crate::decoder::FrameDecoder;
use crate::ledger::ArbitrationLedger;
use crate::report::{ArbitrationReport, LABEL_WIDTH};
use crate::stats::IngestStats;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, trace, warn};

/// One capture file per feed
pub const EXPECTED_CAPTURE_FILES: usize = 2;

#[derive(Error, Debug)]
pub enum ArbiterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("capture directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to list {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("expected exactly {expected} .{extension} files in {}, found {found}", .dir.display())]
    CaptureCount {
        dir: PathBuf,
        extension: String,
        expected: usize,
        found: usize,
    },
}

pub type ArbiterResult<T> = Result<T, ArbiterError>;

/// Regular files in `dir` with the given extension, sorted by path
pub fn find_capture_files(dir: &Path, extension: &str) -> ArbiterResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(ArbiterError::MissingDirectory(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(ArbiterError::NotADirectory(dir.to_path_buf()));
    }

    let read_dir_err = |source| ArbiterError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub struct Arbiter {
    config: ArbiterConfig,
    classifier: FeedClassifier,
    ledger: ArbitrationLedger,
}

impl Arbiter {
    pub fn new(config: ArbiterConfig) -> Self {
        Arbiter {
            classifier: config.classifier(),
            config,
            ledger: ArbitrationLedger::new(),
        }
    }

    /// Decode one frame and record it against its feed.
    ///
    /// Returns the feed the frame was recorded on, or None if it was dropped.
    /// Drops are tallied in `stats`, never propagated.
    pub fn ingest(&mut self, bytes: &[u8], captured_len: usize, stats: &mut IngestStats) -> Option<Feed> {
        stats.record_frame(captured_len.min(bytes.len()));

        let record = match FrameDecoder::decode(bytes, captured_len) {
            Ok(record) => record,
            Err(e) => {
                trace!(error = %e, "frame dropped");
                stats.record_decode_error(&e);
                return None;
            }
        };

        match self.classifier.classify(record.port) {
            Some(feed) => {
                self.ledger.record(feed, record.sequence, record.timestamp_ns);
                stats.record_accepted(feed);
                Some(feed)
            }
            None => {
                trace!(port = record.port, seq = record.sequence, "unclassified port");
                stats.record_unclassified();
                None
            }
        }
    }

    /// Pull frames from `source` until end of stream.
    ///
    /// A read error ends this source early; everything ingested before it
    /// stays in the ledger.
    pub fn drain<S: CaptureSource + ?Sized>(&mut self, source: &mut S, stats: &mut IngestStats) {
        let max_timeouts = self.config.max_consecutive_timeouts;
        let mut idle = 0u32;

        loop {
            match source.next_frame() {
                Ok(NextFrame::Frame(frame)) => {
                    idle = 0;
                    self.ingest(frame.data, frame.captured_len as usize, stats);
                }
                Ok(NextFrame::Timeout) => {
                    stats.record_timeout();
                    idle += 1;
                    if idle >= max_timeouts {
                        warn!(source = stats.source(), timeouts = idle, "capture source idle, giving up");
                        stats.record_read_error(format_args!("gave up after {idle} consecutive timeouts"));
                        break;
                    }
                }
                Ok(NextFrame::EndOfStream) => break,
                Err(e) => {
                    warn!(source = stats.source(), error = %e, "capture read failed, keeping frames read so far");
                    stats.record_read_error(&e);
                    break;
                }
            }
        }
    }

    /// Open and drain one pcap file. An unreadable file is logged and skipped.
    pub fn drain_file(&mut self, path: &Path) -> IngestStats {
        let label = path.display().to_string();
        let mut stats = IngestStats::new(label.clone());

        let mut reader = match PcapReader::open(path) {
            Ok(reader) => reader.with_max_frame_bytes(self.config.max_frame_bytes),
            Err(e) => {
                warn!(file = %label, error = %e, "couldn't open capture, skipping");
                stats.record_open_failure(&e);
                return stats;
            }
        };

        info!(file = %label, "draining capture");
        self.drain(&mut reader, &mut stats);
        info!(
            file = %label,
            frames = stats.frames_read(),
            recorded_a = stats.recorded(Feed::A),
            recorded_b = stats.recorded(Feed::B),
            dropped = stats.drops().total(),
            frames_per_sec = stats.frames_per_sec() as u64,
            "capture drained"
        );
        stats
    }

    pub fn ledger(&self) -> &ArbitrationLedger {
        &self.ledger
    }

    pub fn classifier(&self) -> &FeedClassifier {
        &self.classifier
    }

    pub fn report(&self) -> ArbitrationReport {
        self.ledger.summarize()
    }

    /// Summarize the ledger together with per-file ingest stats
    pub fn finish(self, files: Vec<IngestStats>) -> RunSummary {
        let mut total = IngestStats::new("total");
        for file in &files {
            total.merge(file);
        }
        RunSummary {
            feed_a_port: self.classifier.port(Feed::A),
            feed_b_port: self.classifier.port(Feed::B),
            report: self.ledger.summarize(),
            files,
            total,
        }
    }
}

/// Validate `config`, find the two capture files in `dir` and arbitrate them
pub fn run_directory(config: ArbiterConfig, dir: &Path) -> ArbiterResult<RunSummary> {
    config.validate()?;

    let files = find_capture_files(dir, &config.capture_extension)?;
    if files.len() != EXPECTED_CAPTURE_FILES {
        return Err(ArbiterError::CaptureCount {
            dir: dir.to_path_buf(),
            extension: config.capture_extension.clone(),
            expected: EXPECTED_CAPTURE_FILES,
            found: files.len(),
        });
    }

    let mut arbiter = Arbiter::new(config);
    let stats = files.iter().map(|path| arbiter.drain_file(path)).collect();
    Ok(arbiter.finish(stats))
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub feed_a_port: u16,
    pub feed_b_port: u16,
    pub report: ArbitrationReport,
    pub files: Vec<IngestStats>,
    pub total: IngestStats,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = LABEL_WIDTH;
        writeln!(f, "===== Feed Summary =====")?;
        writeln!(f, "{:<w$}A = {}", "Channels:", self.feed_a_port)?;
        writeln!(f, "{:<w$}B = {}", "", self.feed_b_port)?;
        writeln!(f)?;
        write!(f, "{}", self.report)?;
        writeln!(f)?;
        writeln!(f, "===== Capture Files =====")?;
        for file in &self.files {
            write!(f, "{}", file)?;
        }
        Ok(())
    }
}
