//! Arbitration ledger correctness tests

use feed_arbiter::{ArbitrationLedger, ArbitrationReport, Feed};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn ledger_from(calls: &[(Feed, u32, u64)]) -> ArbitrationLedger {
    let mut ledger = ArbitrationLedger::new();
    for &(feed, seq, ts) in calls {
        ledger.record(feed, seq, ts);
    }
    ledger
}

/// A wins seq 1 by 50, B wins seq 2 by 30, seq 3 only on A, seq 4 only on B
fn four_sequences() -> Vec<(Feed, u32, u64)> {
    vec![
        (Feed::A, 1, 100),
        (Feed::B, 1, 150),
        (Feed::A, 2, 100),
        (Feed::B, 2, 70),
        (Feed::A, 3, 100),
        (Feed::B, 4, 100),
    ]
}

#[test]
fn test_a_faster() {
    let report = ledger_from(&[(Feed::A, 1, 100), (Feed::B, 1, 150)]).summarize();
    assert_eq!(report.matched, 1);
    assert_eq!(report.a_faster, 1);
    assert_eq!(report.avg_a_advantage_ns, 50);
    assert_eq!(report.b_faster, 0);
    assert_eq!(report.ties, 0);
}

#[test]
fn test_b_faster() {
    let report = ledger_from(&[(Feed::A, 2, 100), (Feed::B, 2, 70)]).summarize();
    assert_eq!(report.b_faster, 1);
    assert_eq!(report.avg_b_advantage_ns, 30);
    assert_eq!(report.a_faster, 0);
}

#[test]
fn test_only_one_side() {
    let report = ledger_from(&[(Feed::A, 3, 100)]).summarize();
    assert_eq!(report.only_a, 1);
    assert_eq!(report.matched, 0);

    let report = ledger_from(&[(Feed::B, 4, 100)]).summarize();
    assert_eq!(report.only_b, 1);
    assert_eq!(report.matched, 0);
}

#[test]
fn test_tie() {
    let report = ledger_from(&[(Feed::A, 5, 100), (Feed::B, 5, 100)]).summarize();
    assert_eq!(report.ties, 1);
    assert_eq!(report.avg_a_advantage_ns, 0);
    assert_eq!(report.avg_b_advantage_ns, 0);
}

#[test]
fn test_combined_report() {
    let report = ledger_from(&four_sequences()).summarize();
    assert_eq!(
        report,
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
    );
}

#[test]
fn test_each_sequence_in_one_bucket() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut ledger = ArbitrationLedger::new();
    for seq in 0..2_000u32 {
        if rng.gen_bool(0.9) {
            ledger.record(Feed::A, seq, rng.gen_range(0..1_000));
        }
        if rng.gen_bool(0.9) {
            ledger.record(Feed::B, seq, rng.gen_range(0..1_000));
        }
    }

    let report = ledger.summarize();
    assert_eq!(report.unique_sequences, ledger.unique_sequences() as u64);
    assert_eq!(report.matched + report.only_a + report.only_b, report.unique_sequences);
    assert_eq!(report.a_faster + report.b_faster + report.ties, report.matched);
}

#[test]
fn test_earliest_arrival_wins_despite_late_duplicate() {
    let report = ledger_from(&[
        (Feed::A, 1, 200),
        (Feed::B, 1, 150),
        (Feed::A, 1, 100), // retransmit arrives later in the file but stamped earlier
    ])
    .summarize();
    assert_eq!(report.a_faster, 1);
    assert_eq!(report.avg_a_advantage_ns, 50);
    assert_eq!(report.total_packets_a, 2);
}

#[test]
fn test_sequential_vs_interleaved() {
    let calls = four_sequences();

    let mut sequential: Vec<_> = calls.iter().copied().filter(|c| c.0 == Feed::A).collect();
    sequential.extend(calls.iter().copied().filter(|c| c.0 == Feed::B));

    assert_eq!(ledger_from(&calls).summarize(), ledger_from(&sequential).summarize());
}

#[test]
fn test_order_independence() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut calls = Vec::new();
    for seq in 0..500u32 {
        for _ in 0..rng.gen_range(0..3) {
            calls.push((Feed::A, seq, rng.gen_range(1_000..2_000u64)));
        }
        for _ in 0..rng.gen_range(0..3) {
            calls.push((Feed::B, seq, rng.gen_range(1_000..2_000u64)));
        }
    }

    let expected = ledger_from(&calls).summarize();
    for _ in 0..10 {
        calls.shuffle(&mut rng);
        assert_eq!(ledger_from(&calls).summarize(), expected);
    }
}

#[test]
fn test_large_timestamps_do_not_overflow() {
    let report = ledger_from(&[(Feed::A, 1, 0), (Feed::B, 1, u64::MAX), (Feed::A, 2, 0), (Feed::B, 2, u64::MAX)])
        .summarize();
    assert_eq!(report.a_faster, 2);
    assert_eq!(report.avg_a_advantage_ns, u64::MAX);
}
