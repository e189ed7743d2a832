use std::fmt;

use bgv_reconcile::SwitchWindow;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Blue/green switch strategy under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    B,
    C,
    E,
}

impl Strategy {
    pub fn code(&self) -> &'static str {
        match self {
            Strategy::B => "B",
            Strategy::C => "C",
            Strategy::E => "E",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Strategy::B => "B (Separate Consumer Group + Offset Sync)",
            Strategy::C => "C (Pause/Resume Atomic Switch)",
            Strategy::E => "E (Kafka Connect REST API / Strimzi CRD)",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Run metadata
// ---------------------------------------------------------------------------

/// Context printed alongside the analysis. Not used in any computation.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub run_id: Uuid,
    pub strategy: Strategy,
    /// Which acquisition source fed the run (`"file"`, `"loki"`).
    pub source: String,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub switch_window: Option<SwitchWindow>,
    pub generated_at: DateTime<Utc>,
    /// Hash of the effective layered config.
    pub config_hash: String,
}

impl ReportMeta {
    pub fn period_label(&self) -> String {
        format!(
            "{} ~ {}",
            fmt_opt_ts(self.period_start),
            fmt_opt_ts(self.period_end)
        )
    }

    pub fn switch_label(&self) -> Option<String> {
        self.switch_window
            .map(|w| format!("{} ~ {}", fmt_ts(w.start()), fmt_ts(w.end())))
    }
}

pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn fmt_opt_ts(ts: Option<DateTime<Utc>>) -> String {
    ts.map(fmt_ts).unwrap_or_else(|| "N/A".to_string())
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Row caps for the human-readable renderers. JSON output is never capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLimits {
    pub text_duplicate_rows: usize,
    pub text_missing_sequences: usize,
    pub markdown_duplicate_rows: usize,
    pub markdown_sequence_items: usize,
    pub sequences_per_line: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            text_duplicate_rows: 50,
            text_missing_sequences: 100,
            markdown_duplicate_rows: 100,
            markdown_sequence_items: 200,
            sequences_per_line: 20,
        }
    }
}
