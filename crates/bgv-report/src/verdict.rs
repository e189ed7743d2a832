use std::fmt;

use bgv_reconcile::ReconciliationResult;
use serde::{Deserialize, Serialize};

/// Duplication rate (percent) at or below which a loss-free run still passes.
pub const DEFAULT_DUPLICATION_TOLERANCE_PCT: f64 = 0.1;

/// Thresholds applied to the overall reconciliation result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerdictPolicy {
    pub duplication_tolerance_pct: f64,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            duplication_tolerance_pct: DEFAULT_DUPLICATION_TOLERANCE_PCT,
        }
    }
}

/// Outcome of a validation run.
///
/// Loss always fails. Duplicates above tolerance downgrade a loss-free run to
/// a conditional pass. Extras are reported but never affect the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    ConditionalPass {
        duplication_rate: f64,
        tolerance_pct: f64,
    },
    Fail {
        missing_count: usize,
    },
}

impl Verdict {
    pub fn derive(overall: &ReconciliationResult, policy: &VerdictPolicy) -> Self {
        if overall.missing_count > 0 {
            return Verdict::Fail {
                missing_count: overall.missing_count,
            };
        }
        if overall.duplication_rate > policy.duplication_tolerance_pct {
            return Verdict::ConditionalPass {
                duplication_rate: overall.duplication_rate,
                tolerance_pct: policy.duplication_tolerance_pct,
            };
        }
        Verdict::Pass
    }

    /// Short status word(s) without the explanation.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::ConditionalPass { .. } => "CONDITIONAL PASS",
            Verdict::Fail { .. } => "FAIL",
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Verdict::Fail { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS (loss=0, duplicates within tolerance)"),
            Verdict::ConditionalPass {
                duplication_rate,
                tolerance_pct,
            } => write!(
                f,
                "CONDITIONAL PASS (loss=0, duplicates={duplication_rate:.3}% > {tolerance_pct}% tolerance)"
            ),
            Verdict::Fail { .. } => write!(f, "FAIL (message loss detected)"),
        }
    }
}
