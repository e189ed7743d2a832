//! Phase-based reconciliation around a switch window.
//!
//! GREEN when:
//! - every record lands in exactly one of pre / during / post
//! - window bounds are inclusive for during-switch
//! - `overall` equals a plain reconcile of the unfiltered input
//! - cross-phase delivery shows as missing + extra in buckets but balances overall

use bgv_reconcile::*;
use chrono::{DateTime, Duration, TimeZone, Utc};

fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 20, 10, 5, 0).unwrap() + Duration::seconds(secs)
}

fn window() -> SwitchWindow {
    // 10:05:00 ..= 10:05:05
    SwitchWindow::new(t(0), t(5)).unwrap()
}

fn p(seq: i64, at: i64) -> ProducedRecord {
    ProducedRecord::new(seq, t(at), 0, seq)
}

fn c(seq: i64, at: i64) -> ConsumedRecord {
    ConsumedRecord::new(seq, t(at), 0, seq, "bg-consumer-group")
}

#[test]
fn every_record_falls_in_exactly_one_bucket() {
    let records: Vec<ConsumedRecord> = (-20..=20).map(|s| c(s, s)).collect();
    let buckets = split_by_phase(&records, &window());

    assert_eq!(buckets.total(), records.len());
    assert_eq!(buckets.pre_switch.len(), 20);
    assert_eq!(buckets.during_switch.len(), 6);
    assert_eq!(buckets.post_switch.len(), 15);

    assert!(buckets.pre_switch.iter().all(|r| r.timestamp < t(0)));
    assert!(buckets
        .during_switch
        .iter()
        .all(|r| r.timestamp >= t(0) && r.timestamp <= t(5)));
    assert!(buckets.post_switch.iter().all(|r| r.timestamp > t(5)));
}

#[test]
fn window_boundaries_belong_to_during_switch() {
    let records = vec![c(1, 0), c(2, 5)];
    let buckets = split_by_phase(&records, &window());
    assert!(buckets.pre_switch.is_empty());
    assert_eq!(buckets.during_switch.len(), 2);
    assert!(buckets.post_switch.is_empty());
}

#[test]
fn overall_is_reconciled_from_unfiltered_input() {
    let produced: Vec<ProducedRecord> = (1..=30).map(|s| p(s, s - 10)).collect();
    let mut consumed: Vec<ConsumedRecord> = (1..=30)
        .filter(|s| *s != 12)
        .map(|s| c(s, s - 10))
        .collect();
    consumed.push(c(3, 20));

    let report = reconcile_by_phase(&produced, &consumed, &window());

    assert_eq!(report.overall, reconcile(&produced, &consumed));
    assert_eq!(report.overall.missing_sequences, vec![12]);
    assert_eq!(report.overall.duplicate_count, 1);

    // seq 12 was produced at +2s: missing during the switch only.
    assert_eq!(report.during_switch.missing_sequences, vec![12]);
    assert!(report.pre_switch.missing_sequences.is_empty());

    let counts = report.counts(Phase::DuringSwitch).unwrap();
    assert_eq!(counts.produced, 6);
    assert_eq!(counts.consumed, 5);
    assert!(report.counts(Phase::Overall).is_none());
}

#[test]
fn cross_phase_delivery_balances_only_in_overall() {
    // Produced just before the switch, delivered inside it.
    let produced = vec![p(1, -1), p(2, 1)];
    let consumed = vec![c(1, 1), c(2, 1)];

    let report = reconcile_by_phase(&produced, &consumed, &window());

    assert_eq!(report.pre_switch.missing_sequences, vec![1]);
    assert_eq!(report.during_switch.extra_sequences, vec![1]);
    assert!(report.overall.is_clean());
}

#[test]
fn buckets_iterate_chronologically() {
    let report = reconcile_by_phase(&[], &[], &window());
    let phases: Vec<Phase> = report.buckets().map(|(phase, _)| phase).collect();
    assert_eq!(
        phases,
        vec![Phase::PreSwitch, Phase::DuringSwitch, Phase::PostSwitch]
    );
    assert_eq!(report.get(Phase::Overall), &ReconciliationResult::empty());
}

#[test]
fn analysis_exposes_overall_in_both_shapes() {
    let produced = vec![p(1, -3), p(2, 3)];
    let consumed = vec![c(1, -3)];

    let flat = Analysis::run(&produced, &consumed, None);
    let phased = Analysis::run(&produced, &consumed, Some(&window()));

    assert_eq!(flat.overall(), phased.overall());
    assert!(flat.phases().is_none());
    assert_eq!(
        phased.phases().unwrap().during_switch.missing_sequences,
        vec![2]
    );
}
