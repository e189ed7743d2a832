use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Partition / offset value used when a source does not report one.
pub const UNKNOWN_LOCATION: i64 = -1;

/// Consumer group recorded when a source does not report one.
pub const UNKNOWN_GROUP_ID: &str = "unknown";

/// Common view over produced and consumed records.
///
/// The phase splitter only needs a timestamp; the engine only needs a seq.
pub trait SequencedRecord {
    fn seq(&self) -> i64;
    fn timestamp(&self) -> DateTime<Utc>;
}

/// One publish event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducedRecord {
    pub seq: i64,
    pub timestamp: DateTime<Utc>,
    pub partition: i32,
    pub offset: i64,
}

impl ProducedRecord {
    pub fn new(seq: i64, timestamp: DateTime<Utc>, partition: i32, offset: i64) -> Self {
        Self {
            seq,
            timestamp,
            partition,
            offset,
        }
    }
}

impl SequencedRecord for ProducedRecord {
    fn seq(&self) -> i64 {
        self.seq
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// One delivery of a sequence number to a consumer group.
/// Several records may share a `seq` (redelivery).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedRecord {
    pub seq: i64,
    pub timestamp: DateTime<Utc>,
    pub partition: i32,
    pub offset: i64,
    pub group_id: String,
}

impl ConsumedRecord {
    pub fn new(
        seq: i64,
        timestamp: DateTime<Utc>,
        partition: i32,
        offset: i64,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            seq,
            timestamp,
            partition,
            offset,
            group_id: group_id.into(),
        }
    }
}

impl SequencedRecord for ConsumedRecord {
    fn seq(&self) -> i64 {
        self.seq
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// A sequence number delivered more than once.
///
/// `partitions` and `offsets` list every occurrence in the order the
/// deliveries appeared in the consumed input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateDelivery {
    pub seq: i64,
    /// Total deliveries of `seq` (always >= 2).
    pub count: usize,
    pub partitions: Vec<i32>,
    pub offsets: Vec<i64>,
    pub group_ids: BTreeSet<String>,
}

impl DuplicateDelivery {
    /// Deliveries beyond the first.
    pub fn excess(&self) -> usize {
        self.count.saturating_sub(1)
    }
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Distinct produced seq count.
    pub total_produced: usize,
    /// Consumed record count, redeliveries included.
    pub total_consumed: usize,
    /// Distinct consumed seq count.
    pub unique_consumed: usize,
    pub missing_count: usize,
    pub missing_sequences: Vec<i64>,
    /// Sum of excess deliveries, not the number of duplicated seqs.
    pub duplicate_count: usize,
    pub duplicate_sequences: Vec<DuplicateDelivery>,
    pub extra_count: usize,
    pub extra_sequences: Vec<i64>,
    /// Percent of produced seqs never delivered.
    pub loss_rate: f64,
    /// Percent of deliveries that were redeliveries.
    pub duplication_rate: f64,
}

impl ReconciliationResult {
    /// The result of reconciling two empty inputs.
    pub fn empty() -> Self {
        Self {
            total_produced: 0,
            total_consumed: 0,
            unique_consumed: 0,
            missing_count: 0,
            missing_sequences: Vec::new(),
            duplicate_count: 0,
            duplicate_sequences: Vec::new(),
            extra_count: 0,
            extra_sequences: Vec::new(),
            loss_rate: 0.0,
            duplication_rate: 0.0,
        }
    }

    /// No loss, no redelivery, nothing unexpected.
    pub fn is_clean(&self) -> bool {
        self.missing_count == 0 && self.duplicate_count == 0 && self.extra_count == 0
    }
}
