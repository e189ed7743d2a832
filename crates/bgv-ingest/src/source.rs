//! Source boundary for record acquisition.
//!
//! Defines the time range, the per-record diagnostic, the fetch result
//! wrapper, the error type and the [`RecordSource`] trait. Concrete sources
//! live in `file.rs` and `loki.rs`.

use std::fmt;

use bgv_reconcile::{ConsumedRecord, ProducedRecord, SequencedRecord};
use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Time range
// ---------------------------------------------------------------------------

/// Inclusive collection window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }
}

// ---------------------------------------------------------------------------
// Fetch result
// ---------------------------------------------------------------------------

/// Maximum characters of a rejected entry kept in its diagnostic.
pub const EXCERPT_MAX_CHARS: usize = 200;

/// A source entry that was dropped instead of becoming a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Where the entry came from (e.g. `producer.log:17`, `loki@1708420801000000000`).
    pub location: String,
    pub reason: String,
    /// Leading part of the raw entry.
    pub excerpt: String,
}

impl SkippedEntry {
    pub fn new(location: impl Into<String>, reason: impl Into<String>, raw: &str) -> Self {
        Self {
            location: location.into(),
            reason: reason.into(),
            excerpt: raw.chars().take(EXCERPT_MAX_CHARS).collect(),
        }
    }
}

impl fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.location, self.reason, self.excerpt)
    }
}

/// Records fetched from one source plus the entries that were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested<R> {
    pub records: Vec<R>,
    pub skipped: Vec<SkippedEntry>,
    /// Well-formed records dropped because their timestamp fell outside the
    /// requested [`TimeRange`]. Always 0 for sources that filter server-side.
    pub filtered_out: usize,
}

impl<R: SequencedRecord> Ingested<R> {
    /// Sort records by seq. Stable: repeated seqs keep source order.
    pub fn sorted(mut records: Vec<R>, skipped: Vec<SkippedEntry>) -> Self {
        records.sort_by_key(|r| r.seq());
        Self {
            records,
            skipped,
            filtered_out: 0,
        }
    }

    pub fn with_filtered_out(mut self, filtered_out: usize) -> Self {
        self.filtered_out = filtered_out;
        self
    }
}

impl<R> Default for Ingested<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
            filtered_out: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Source-level failures. Any of these is fatal to a validation run.
#[derive(Debug)]
pub enum SourceError {
    /// Endpoint unreachable or request timed out.
    Connectivity { source: String, cause: String },
    /// The source answered, but not with something we can read.
    Format { source: String, detail: String },
    /// Input file does not exist.
    NotFound { path: String },
    /// Input path unreadable or not a regular file.
    Io { path: String, cause: String },
    /// The source cannot serve this request as configured.
    Config(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Connectivity { source, cause } => {
                write!(f, "cannot reach {source}: {cause}")
            }
            SourceError::Format { source, detail } => {
                write!(f, "unexpected response from {source}: {detail}")
            }
            SourceError::NotFound { path } => write!(f, "log file not found: {path}"),
            SourceError::Io { path, cause } => write!(f, "cannot read {path}: {cause}"),
            SourceError::Config(msg) => write!(f, "source config error: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Where producer and consumer records come from.
///
/// Object safe so callers can hold a `Box<dyn RecordSource>` chosen at
/// runtime.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Short identifier used in logs (e.g. `"file"`, `"loki"`).
    fn name(&self) -> &'static str;

    async fn fetch_produced(
        &self,
        range: &TimeRange,
    ) -> Result<Ingested<ProducedRecord>, SourceError>;

    async fn fetch_consumed(
        &self,
        range: &TimeRange,
    ) -> Result<Ingested<ConsumedRecord>, SourceError>;
}
