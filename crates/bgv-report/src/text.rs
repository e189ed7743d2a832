use bgv_reconcile::Phase;

use crate::{fmt_num, ReportLimits, ValidationReport};

/// Plain-text report for the terminal.
pub fn render_text(report: &ValidationReport, limits: &ReportLimits) -> String {
    let meta = &report.meta;
    let overall = report.analysis.overall();

    let mut lines: Vec<String> = vec![
        "=== Blue/Green Switch Validation Report ===".to_string(),
        format!("Period: {}", meta.period_label()),
        format!("Strategy: {}", meta.strategy),
        String::new(),
    ];

    if let Some(window) = meta.switch_label() {
        lines.push(format!("Switch Window: {window}"));
        lines.push(String::new());
    }

    lines.extend([
        "--- Summary ---".to_string(),
        format!("Total Produced:     {}", fmt_num(overall.total_produced)),
        format!("Total Consumed:     {}", fmt_num(overall.total_consumed)),
        format!(
            "Missing (Loss):     {} ({:.3}%)",
            fmt_num(overall.missing_count),
            overall.loss_rate
        ),
        format!(
            "Duplicates:         {} ({:.3}%)",
            fmt_num(overall.duplicate_count),
            overall.duplication_rate
        ),
        format!("Extra:              {}", fmt_num(overall.extra_count)),
        String::new(),
    ]);

    if let Some(phases) = report.analysis.phases() {
        lines.push("--- Phase Analysis ---".to_string());
        for phase in Phase::BUCKETS {
            let r = phases.get(phase);
            lines.push(format!(
                "{:<15} Produced={:>7}  Consumed={:>7}  Loss={}  Dup={}",
                phase.label(),
                fmt_num(r.total_produced),
                fmt_num(r.total_consumed),
                fmt_num(r.missing_count),
                fmt_num(r.duplicate_count),
            ));
        }
        lines.push(String::new());
    }

    if !overall.duplicate_sequences.is_empty() {
        let cap = limits.text_duplicate_rows;
        lines.push("--- Duplicate Details ---".to_string());
        for dup in overall.duplicate_sequences.iter().take(cap) {
            lines.push(format!(
                "Seq#{}: consumed {} times (partitions: {:?}, offsets: {:?})",
                dup.seq, dup.count, dup.partitions, dup.offsets
            ));
        }
        if overall.duplicate_sequences.len() > cap {
            lines.push(format!(
                "... and {} more",
                overall.duplicate_sequences.len() - cap
            ));
        }
        lines.push(String::new());
    }

    if !overall.missing_sequences.is_empty() {
        let cap = limits.text_missing_sequences;
        let shown = &overall.missing_sequences[..overall.missing_sequences.len().min(cap)];
        lines.push("--- Missing Sequence Details ---".to_string());
        lines.push(format!("Sequences: {shown:?}"));
        if overall.missing_sequences.len() > cap {
            lines.push(format!(
                "... and {} more",
                overall.missing_sequences.len() - cap
            ));
        }
        lines.push(String::new());
    }

    lines.push(format!("--- RESULT: {} ---", report.verdict));
    lines.push(String::new());

    lines.join("\n")
}
