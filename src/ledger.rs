//! A/B arbitration ledger
//!
//! Tracks, per sequence number and per feed, the earliest capture timestamp
//! and how many copies arrived. `summarize` walks every sequence once and
//! decides which feed won it.

use crate::classifier::Feed;
use crate::report::ArbitrationReport;
use std::collections::HashMap;

/// Pre-sized for a typical capture window
const INITIAL_CAPACITY: usize = 25_000;

/// Accumulator for one feed of one sequence number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideInfo {
    pub seen: bool,
    pub earliest_ns: u64,
    pub count: u64,
}

impl SideInfo {
    fn observe(&mut self, timestamp_ns: u64) {
        self.earliest_ns = if self.seen {
            self.earliest_ns.min(timestamp_ns)
        } else {
            timestamp_ns
        };
        self.count += 1;
        self.seen = true;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceEntry {
    pub a: SideInfo,
    pub b: SideInfo,
}

impl SequenceEntry {
    pub fn side(&self, feed: Feed) -> &SideInfo {
        match feed {
            Feed::A => &self.a,
            Feed::B => &self.b,
        }
    }

    fn side_mut(&mut self, feed: Feed) -> &mut SideInfo {
        match feed {
            Feed::A => &mut self.a,
            Feed::B => &mut self.b,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArbitrationLedger {
    entries: HashMap<u32, SequenceEntry>,
    total_a: u64,
    total_b: u64,
}

impl ArbitrationLedger {
    pub fn new() -> Self {
        ArbitrationLedger {
            entries: HashMap::with_capacity(INITIAL_CAPACITY),
            total_a: 0,
            total_b: 0,
        }
    }

    /// Record one arrival of `sequence` on `feed`
    pub fn record(&mut self, feed: Feed, sequence: u32, timestamp_ns: u64) {
        self.entries
            .entry(sequence)
            .or_default()
            .side_mut(feed)
            .observe(timestamp_ns);

        match feed {
            Feed::A => self.total_a += 1,
            Feed::B => self.total_b += 1,
        }
    }

    /// Compute arbitration outcomes over every sequence seen so far.
    ///
    /// Each sequence lands in exactly one bucket: only A, only B, A faster,
    /// B faster, or tie. Averages are integer nanoseconds.
    pub fn summarize(&self) -> ArbitrationReport {
        let mut report = ArbitrationReport {
            unique_sequences: self.entries.len() as u64,
            total_packets_a: self.total_a,
            total_packets_b: self.total_b,
            ..ArbitrationReport::default()
        };

        let mut a_advantage_sum: u128 = 0;
        let mut b_advantage_sum: u128 = 0;

        for entry in self.entries.values() {
            match (entry.a.seen, entry.b.seen) {
                (true, false) => report.only_a += 1,
                (false, true) => report.only_b += 1,
                (true, true) => {
                    report.matched += 1;
                    let (a, b) = (entry.a.earliest_ns, entry.b.earliest_ns);
                    if a < b {
                        report.a_faster += 1;
                        a_advantage_sum += (b - a) as u128;
                    } else if b < a {
                        report.b_faster += 1;
                        b_advantage_sum += (a - b) as u128;
                    } else {
                        report.ties += 1;
                    }
                }
                // entries are only created by record()
                (false, false) => {}
            }
        }

        report.avg_a_advantage_ns = average(a_advantage_sum, report.a_faster);
        report.avg_b_advantage_ns = average(b_advantage_sum, report.b_faster);
        report
    }

    /// Number of distinct sequence numbers seen on either feed
    pub fn unique_sequences(&self) -> usize {
        self.entries.len()
    }

    /// Packets recorded for `feed`, duplicates included
    pub fn total_packets(&self, feed: Feed) -> u64 {
        match feed {
            Feed::A => self.total_a,
            Feed::B => self.total_b,
        }
    }

    pub fn entry(&self, sequence: u32) -> Option<&SequenceEntry> {
        self.entries.get(&sequence)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ArbitrationLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn average(sum: u128, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        (sum / count as u128) as u64
    }
}
