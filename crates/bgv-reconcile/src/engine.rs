use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{ConsumedRecord, DuplicateDelivery, ProducedRecord, ReconciliationResult};

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Collect occurrence details for every seq delivered more than once.
///
/// Walks `consumed` in input order so partitions/offsets keep their
/// delivery sequence. Output is sorted by seq.
fn collect_duplicates(
    consumed: &[ConsumedRecord],
    delivery_counts: &HashMap<i64, usize>,
) -> Vec<DuplicateDelivery> {
    let mut by_seq: HashMap<i64, DuplicateDelivery> = HashMap::new();

    for r in consumed {
        let count = delivery_counts.get(&r.seq).copied().unwrap_or(0);
        if count < 2 {
            continue;
        }
        let dup = by_seq.entry(r.seq).or_insert_with(|| DuplicateDelivery {
            seq: r.seq,
            count,
            partitions: Vec::with_capacity(count),
            offsets: Vec::with_capacity(count),
            group_ids: BTreeSet::new(),
        });
        dup.partitions.push(r.partition);
        dup.offsets.push(r.offset);
        if !dup.group_ids.contains(&r.group_id) {
            dup.group_ids.insert(r.group_id.clone());
        }
    }

    let mut out: Vec<DuplicateDelivery> = by_seq.into_values().collect();
    out.sort_by_key(|d| d.seq);
    out
}

/// Reconcile produced against consumed records.
///
/// - Missing = produced seqs never delivered
/// - Extra = delivered seqs never produced
/// - Duplicates = seqs delivered more than once; `duplicate_count` sums the
///   excess deliveries
///
/// Producer-side repeats of a seq collapse into one: only consumer-side
/// multiplicity is measured. Input order does not affect the result except
/// for the per-duplicate occurrence lists, which follow `consumed` order.
///
/// Total over any input, including empty slices. Expected O(n + m).
pub fn reconcile(produced: &[ProducedRecord], consumed: &[ConsumedRecord]) -> ReconciliationResult {
    let produced_seqs: HashSet<i64> = produced.iter().map(|r| r.seq).collect();

    let mut delivery_counts: HashMap<i64, usize> = HashMap::with_capacity(consumed.len());
    for r in consumed {
        *delivery_counts.entry(r.seq).or_insert(0) += 1;
    }

    let mut missing_sequences: Vec<i64> = produced_seqs
        .iter()
        .copied()
        .filter(|seq| !delivery_counts.contains_key(seq))
        .collect();
    missing_sequences.sort_unstable();

    let mut extra_sequences: Vec<i64> = delivery_counts
        .keys()
        .copied()
        .filter(|seq| !produced_seqs.contains(seq))
        .collect();
    extra_sequences.sort_unstable();

    let duplicate_sequences = collect_duplicates(consumed, &delivery_counts);
    let duplicate_count: usize = duplicate_sequences.iter().map(DuplicateDelivery::excess).sum();

    let total_produced = produced_seqs.len();
    let total_consumed = consumed.len();

    ReconciliationResult {
        total_produced,
        total_consumed,
        unique_consumed: delivery_counts.len(),
        missing_count: missing_sequences.len(),
        loss_rate: percent(missing_sequences.len(), total_produced),
        missing_sequences,
        duplicate_count,
        duplication_rate: percent(duplicate_count, total_consumed),
        duplicate_sequences,
        extra_count: extra_sequences.len(),
        extra_sequences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn p(seq: i64) -> ProducedRecord {
        ProducedRecord::new(seq, Utc.timestamp_opt(1_700_000_000, 0).unwrap(), 0, seq)
    }

    fn c(seq: i64, partition: i32, offset: i64, group: &str) -> ConsumedRecord {
        ConsumedRecord::new(
            seq,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            partition,
            offset,
            group,
        )
    }

    #[test]
    fn empty_inputs_give_empty_result() {
        assert_eq!(reconcile(&[], &[]), ReconciliationResult::empty());
    }

    #[test]
    fn producer_duplicates_collapse() {
        let produced = vec![p(1), p(1), p(2)];
        let consumed = vec![c(1, 0, 10, "g"), c(2, 0, 11, "g")];
        let r = reconcile(&produced, &consumed);
        assert_eq!(r.total_produced, 2);
        assert!(r.is_clean());
    }

    #[test]
    fn duplicate_occurrences_follow_input_order() {
        let produced = vec![p(7)];
        let consumed = vec![
            c(7, 2, 300, "blue"),
            c(7, 1, 100, "green"),
            c(7, 2, 301, "blue"),
        ];
        let r = reconcile(&produced, &consumed);
        assert_eq!(r.duplicate_count, 2);
        let d = &r.duplicate_sequences[0];
        assert_eq!(d.seq, 7);
        assert_eq!(d.count, 3);
        assert_eq!(d.partitions, vec![2, 1, 2]);
        assert_eq!(d.offsets, vec![300, 100, 301]);
        let groups: Vec<&str> = d.group_ids.iter().map(String::as_str).collect();
        assert_eq!(groups, vec!["blue", "green"]);
    }

    #[test]
    fn missing_and_extra_are_sorted() {
        let produced = vec![p(5), p(3), p(1)];
        let consumed = vec![c(9, 0, 0, "g"), c(8, 0, 1, "g"), c(3, 0, 2, "g")];
        let r = reconcile(&produced, &consumed);
        assert_eq!(r.missing_sequences, vec![1, 5]);
        assert_eq!(r.extra_sequences, vec![8, 9]);
        assert_eq!(r.unique_consumed, 3);
    }

    #[test]
    fn only_consumed_gives_full_duplication_accounting() {
        let consumed = vec![c(1, 0, 0, "g"), c(1, 0, 1, "g")];
        let r = reconcile(&[], &consumed);
        assert_eq!(r.loss_rate, 0.0);
        assert_eq!(r.extra_sequences, vec![1]);
        assert!((r.duplication_rate - 50.0).abs() < 1e-9);
    }
}
