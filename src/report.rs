//! Arbitration report and its text rendering

use serde::Serialize;
use std::fmt;

/// Label column width for the text tables
pub(crate) const LABEL_WIDTH: usize = 30;

/// Snapshot of arbitration outcomes produced by `ArbitrationLedger::summarize`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArbitrationReport {
    pub unique_sequences: u64,
    pub total_packets_a: u64,
    pub total_packets_b: u64,

    pub matched: u64,
    pub only_a: u64,
    pub only_b: u64,

    pub a_faster: u64,
    pub b_faster: u64,
    pub ties: u64,

    /// Mean lead of A over B across sequences A won (ns)
    pub avg_a_advantage_ns: u64,
    /// Mean lead of B over A across sequences B won (ns)
    pub avg_b_advantage_ns: u64,
}

impl ArbitrationReport {
    /// Share of matched sequences won by A, in [0, 1]
    pub fn a_win_ratio(&self) -> f64 {
        if self.matched == 0 {
            0.0
        } else {
            self.a_faster as f64 / self.matched as f64
        }
    }

    /// Share of matched sequences won by B, in [0, 1]
    pub fn b_win_ratio(&self) -> f64 {
        if self.matched == 0 {
            0.0
        } else {
            self.b_faster as f64 / self.matched as f64
        }
    }
}

impl fmt::Display for ArbitrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = LABEL_WIDTH;
        writeln!(f, "{:<w$}{}", "Total unique seqs", self.unique_sequences)?;
        writeln!(f, "{:<w$}{}", "Total packets from A", self.total_packets_a)?;
        writeln!(f, "{:<w$}{}", "Total packets from B", self.total_packets_b)?;
        writeln!(f)?;
        writeln!(f, "{:<w$}{}", "Matched seqs", self.matched)?;
        writeln!(f, "{:<w$}{}", "Only in A", self.only_a)?;
        writeln!(f, "{:<w$}{}", "Only in B", self.only_b)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<w$}{} ({:.1}%)",
            "A faster count",
            self.a_faster,
            self.a_win_ratio() * 100.0
        )?;
        writeln!(f, "{:<w$}{} ns", "A avg speed advantage", self.avg_a_advantage_ns)?;
        writeln!(
            f,
            "{:<w$}{} ({:.1}%)",
            "B faster count",
            self.b_faster,
            self.b_win_ratio() * 100.0
        )?;
        writeln!(f, "{:<w$}{} ns", "B avg speed advantage", self.avg_b_advantage_ns)?;
        writeln!(f, "{:<w$}{}", "Packets with same speed", self.ties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ArbitrationReport {
        ArbitrationReport {
            unique_sequences: 4,
            total_packets_a: 3,
            total_packets_b: 3,
            matched: 2,
            only_a: 1,
            only_b: 1,
            a_faster: 1,
            b_faster: 1,
            ties: 0,
            avg_a_advantage_ns: 50,
            avg_b_advantage_ns: 30,
        }
    }

    #[test]
    fn test_display_columns() {
        let text = sample().to_string();
        assert!(text.contains("Total unique seqs             4"));
        assert!(text.contains("A avg speed advantage         50 ns"));
        assert!(text.contains("B faster count                1 (50.0%)"));
    }

    #[test]
    fn test_win_ratio_without_matches() {
        let report = ArbitrationReport::default();
        assert_eq!(report.a_win_ratio(), 0.0);
        assert_eq!(report.b_win_ratio(), 0.0);
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"avg_a_advantage_ns\":50"));
        assert!(json.contains("\"only_b\":1"));
    }
}
