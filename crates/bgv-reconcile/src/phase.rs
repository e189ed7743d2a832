use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::reconcile;
use crate::{ConsumedRecord, ProducedRecord, ReconciliationResult, SequencedRecord};

// ---------------------------------------------------------------------------
// Phase + switch window
// ---------------------------------------------------------------------------

/// Time bucket relative to the switch window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PreSwitch,
    DuringSwitch,
    PostSwitch,
    /// The whole unfiltered input.
    Overall,
}

impl Phase {
    /// The three disjoint time buckets, in chronological order.
    pub const BUCKETS: [Phase; 3] = [Phase::PreSwitch, Phase::DuringSwitch, Phase::PostSwitch];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PreSwitch => "pre_switch",
            Phase::DuringSwitch => "during_switch",
            Phase::PostSwitch => "post_switch",
            Phase::Overall => "overall",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::PreSwitch => "Pre-Switch",
            Phase::DuringSwitch => "During Switch",
            Phase::PostSwitch => "Post-Switch",
            Phase::Overall => "Overall",
        }
    }

    /// Bucket a timestamp. Both window ends belong to `DuringSwitch`.
    /// Never returns `Overall`.
    pub fn classify(ts: DateTime<Utc>, window: &SwitchWindow) -> Phase {
        window.bucket(ts).into()
    }
}

/// The time-bucket subset of [`Phase`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwitchBucket {
    PreSwitch,
    DuringSwitch,
    PostSwitch,
}

impl From<SwitchBucket> for Phase {
    fn from(bucket: SwitchBucket) -> Self {
        match bucket {
            SwitchBucket::PreSwitch => Phase::PreSwitch,
            SwitchBucket::DuringSwitch => Phase::DuringSwitch,
            SwitchBucket::PostSwitch => Phase::PostSwitch,
        }
    }
}

/// Rejected switch window: `start` must be strictly before `end`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidSwitchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl std::fmt::Display for InvalidSwitchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "switch start {} must be before switch end {}",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

impl std::error::Error for InvalidSwitchWindow {}

/// Interval during which the cutover happened. Always `start < end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SwitchWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SwitchWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidSwitchWindow> {
        if start >= end {
            return Err(InvalidSwitchWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Both window ends belong to `DuringSwitch`.
    pub fn bucket(&self, ts: DateTime<Utc>) -> SwitchBucket {
        if ts < self.start {
            SwitchBucket::PreSwitch
        } else if ts > self.end {
            SwitchBucket::PostSwitch
        } else {
            SwitchBucket::DuringSwitch
        }
    }
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Records of one side split into the three time buckets.
/// Relative input order is preserved inside each bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseBuckets<R> {
    pub pre_switch: Vec<R>,
    pub during_switch: Vec<R>,
    pub post_switch: Vec<R>,
}

impl<R> PhaseBuckets<R> {
    pub fn get(&self, phase: Phase) -> Option<&[R]> {
        match phase {
            Phase::PreSwitch => Some(&self.pre_switch),
            Phase::DuringSwitch => Some(&self.during_switch),
            Phase::PostSwitch => Some(&self.post_switch),
            Phase::Overall => None,
        }
    }

    pub fn total(&self) -> usize {
        self.pre_switch.len() + self.during_switch.len() + self.post_switch.len()
    }
}

/// Assign every record to exactly one bucket.
pub fn split_by_phase<R: SequencedRecord + Clone>(
    records: &[R],
    window: &SwitchWindow,
) -> PhaseBuckets<R> {
    let mut buckets = PhaseBuckets {
        pre_switch: Vec::new(),
        during_switch: Vec::new(),
        post_switch: Vec::new(),
    };
    for r in records {
        let bucket = match window.bucket(r.timestamp()) {
            SwitchBucket::PreSwitch => &mut buckets.pre_switch,
            SwitchBucket::DuringSwitch => &mut buckets.during_switch,
            SwitchBucket::PostSwitch => &mut buckets.post_switch,
        };
        bucket.push(r.clone());
    }
    buckets
}

// ---------------------------------------------------------------------------
// Phase report
// ---------------------------------------------------------------------------

/// Input record counts per bucket (produced, consumed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCounts {
    pub produced: usize,
    pub consumed: usize,
}

/// One reconciliation per bucket plus `overall` over the unfiltered input.
///
/// `overall` is computed directly, never summed from the buckets: a message
/// produced before the switch and delivered during it shows as missing in
/// `pre_switch` and extra in `during_switch`, yet balances in `overall`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PhaseReport {
    pub window: SwitchWindow,
    pub pre_switch: ReconciliationResult,
    pub during_switch: ReconciliationResult,
    pub post_switch: ReconciliationResult,
    pub overall: ReconciliationResult,
    pub input_counts: [PhaseCounts; 3],
}

impl PhaseReport {
    pub fn get(&self, phase: Phase) -> &ReconciliationResult {
        match phase {
            Phase::PreSwitch => &self.pre_switch,
            Phase::DuringSwitch => &self.during_switch,
            Phase::PostSwitch => &self.post_switch,
            Phase::Overall => &self.overall,
        }
    }

    /// Input counts for a time bucket; `Overall` has none.
    pub fn counts(&self, phase: Phase) -> Option<PhaseCounts> {
        Phase::BUCKETS
            .iter()
            .position(|p| *p == phase)
            .map(|i| self.input_counts[i])
    }

    /// Buckets in chronological order.
    pub fn buckets(&self) -> impl Iterator<Item = (Phase, &ReconciliationResult)> {
        Phase::BUCKETS.into_iter().map(move |p| (p, self.get(p)))
    }
}

/// Reconcile each switch phase independently, plus the whole input.
pub fn reconcile_by_phase(
    produced: &[ProducedRecord],
    consumed: &[ConsumedRecord],
    window: &SwitchWindow,
) -> PhaseReport {
    let produced_buckets = split_by_phase(produced, window);
    let consumed_buckets = split_by_phase(consumed, window);

    let bucket = |phase: Phase| -> (ReconciliationResult, PhaseCounts) {
        let p = produced_buckets.get(phase).unwrap_or_default();
        let c = consumed_buckets.get(phase).unwrap_or_default();
        (
            reconcile(p, c),
            PhaseCounts {
                produced: p.len(),
                consumed: c.len(),
            },
        )
    };

    let (pre_switch, pre_counts) = bucket(Phase::PreSwitch);
    let (during_switch, during_counts) = bucket(Phase::DuringSwitch);
    let (post_switch, post_counts) = bucket(Phase::PostSwitch);

    PhaseReport {
        window: *window,
        pre_switch,
        during_switch,
        post_switch,
        overall: reconcile(produced, consumed),
        input_counts: [pre_counts, during_counts, post_counts],
    }
}

// ---------------------------------------------------------------------------
// Analysis (renderer input)
// ---------------------------------------------------------------------------

/// What one validation run produced: a single overall pass, or a full
/// phase breakdown when a switch window was supplied.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Analysis {
    Overall { overall: ReconciliationResult },
    Phased(PhaseReport),
}

impl Analysis {
    /// Reconcile without phases, or by phase when `window` is given.
    pub fn run(
        produced: &[ProducedRecord],
        consumed: &[ConsumedRecord],
        window: Option<&SwitchWindow>,
    ) -> Self {
        match window {
            Some(w) => Analysis::Phased(reconcile_by_phase(produced, consumed, w)),
            None => Analysis::Overall {
                overall: reconcile(produced, consumed),
            },
        }
    }

    pub fn overall(&self) -> &ReconciliationResult {
        match self {
            Analysis::Overall { overall } => overall,
            Analysis::Phased(report) => &report.overall,
        }
    }

    pub fn phases(&self) -> Option<&PhaseReport> {
        match self {
            Analysis::Overall { .. } => None,
            Analysis::Phased(report) => Some(report),
        }
    }
}
