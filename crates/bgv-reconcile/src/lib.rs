//! bgv-reconcile
//!
//! Sequence reconciliation engine for producer/consumer event logs.
//!
//! Architectural decisions:
//! - Producer side is collapsed to a set of sequence numbers
//! - Consumer side keeps multiplicity; redelivery is the measured signal
//! - Missing / extra / duplicate lists are sorted by seq
//! - Phase buckets are reconciled independently; `overall` is never a sum of buckets
//!
//! Deterministic, pure logic. No IO. No logging.

mod engine;
mod phase;
mod types;

pub use engine::reconcile;
pub use phase::{
    reconcile_by_phase, split_by_phase, Analysis, InvalidSwitchWindow, Phase, PhaseBuckets,
    PhaseCounts, PhaseReport, SwitchBucket, SwitchWindow,
};
pub use types::*;
