//! bgv-report
//!
//! Turns an [`Analysis`] into a verdict and human/machine readable reports.
//! Renderers only read; nothing here recomputes reconciliation numbers.

use bgv_reconcile::Analysis;
use serde::Serialize;

mod markdown;
mod meta;
mod output;
mod text;
mod verdict;

pub use markdown::render_markdown;
pub use meta::{ReportLimits, ReportMeta, Strategy};
pub use output::{render_json, write_report};
pub use text::render_text;
pub use verdict::{Verdict, VerdictPolicy, DEFAULT_DUPLICATION_TOLERANCE_PCT};

/// Everything a renderer needs for one run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub meta: ReportMeta,
    pub verdict: Verdict,
    pub analysis: Analysis,
}

impl ValidationReport {
    /// Derive the verdict from the overall result under `policy`.
    pub fn new(meta: ReportMeta, analysis: Analysis, policy: &VerdictPolicy) -> Self {
        let verdict = Verdict::derive(analysis.overall(), policy);
        Self {
            meta,
            verdict,
            analysis,
        }
    }
}

/// Integer with `,` thousands separators.
pub fn fmt_num(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
