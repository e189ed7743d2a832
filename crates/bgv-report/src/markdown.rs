use bgv_reconcile::Phase;

use crate::{fmt_num, ReportLimits, ValidationReport};

/// Markdown report for the report directory.
pub fn render_markdown(report: &ValidationReport, limits: &ReportLimits) -> String {
    let meta = &report.meta;
    let overall = report.analysis.overall();
    let strategy = meta.strategy.display_name();

    let mut lines: Vec<String> = vec![
        format!("# Validation Report: Strategy {strategy}"),
        String::new(),
        format!(
            "> Generated: {}",
            meta.generated_at.format("%Y-%m-%dT%H:%M:%SZ")
        ),
        String::new(),
        "## Test Parameters".to_string(),
        String::new(),
        "| Parameter | Value |".to_string(),
        "|-----------|-------|".to_string(),
        format!("| Strategy | {strategy} |"),
        format!("| Test Period | {} |", meta.period_label()),
    ];
    if let Some(window) = meta.switch_label() {
        lines.push(format!("| Switch Window | {window} |"));
    }
    lines.push(format!("| Source | {} |", meta.source));
    lines.push(format!("| Run ID | {} |", meta.run_id));
    if !meta.config_hash.is_empty() {
        lines.push(format!("| Config Hash | `{}` |", meta.config_hash));
    }

    lines.extend([
        String::new(),
        "## Summary".to_string(),
        String::new(),
        "| Metric | Value |".to_string(),
        "|--------|-------|".to_string(),
        format!("| Total Produced | {} |", fmt_num(overall.total_produced)),
        format!("| Total Consumed | {} |", fmt_num(overall.total_consumed)),
        format!("| Unique Consumed | {} |", fmt_num(overall.unique_consumed)),
        format!(
            "| Missing (Loss) | {} ({:.3}%) |",
            fmt_num(overall.missing_count),
            overall.loss_rate
        ),
        format!(
            "| Duplicates | {} ({:.3}%) |",
            fmt_num(overall.duplicate_count),
            overall.duplication_rate
        ),
        format!("| Extra | {} |", fmt_num(overall.extra_count)),
        String::new(),
        format!("**Verdict: {}**", report.verdict),
        String::new(),
    ]);

    if let Some(phases) = report.analysis.phases() {
        lines.extend([
            "## Phase Analysis".to_string(),
            String::new(),
            "| Phase | Produced | Consumed | Loss | Duplicates | Loss Rate | Dup Rate |".to_string(),
            "|-------|----------|----------|------|------------|-----------|----------|".to_string(),
        ]);
        for phase in Phase::BUCKETS {
            let r = phases.get(phase);
            lines.push(format!(
                "| {} | {} | {} | {} | {} | {:.3}% | {:.3}% |",
                phase.label(),
                fmt_num(r.total_produced),
                fmt_num(r.total_consumed),
                fmt_num(r.missing_count),
                fmt_num(r.duplicate_count),
                r.loss_rate,
                r.duplication_rate,
            ));
        }
        lines.push(String::new());
    }

    if !overall.duplicate_sequences.is_empty() {
        let cap = limits.markdown_duplicate_rows;
        lines.extend([
            "## Duplicate Details".to_string(),
            String::new(),
            "| Seq # | Count | Partitions | Offsets | Consumer Groups |".to_string(),
            "|-------|-------|------------|---------|-----------------|".to_string(),
        ]);
        for dup in overall.duplicate_sequences.iter().take(cap) {
            let groups: Vec<&str> = dup.group_ids.iter().map(String::as_str).collect();
            lines.push(format!(
                "| {} | {} | {:?} | {:?} | {} |",
                dup.seq,
                dup.count,
                dup.partitions,
                dup.offsets,
                groups.join(", ")
            ));
        }
        if overall.duplicate_sequences.len() > cap {
            lines.push(format!(
                "| ... | {} more entries | | | |",
                overall.duplicate_sequences.len() - cap
            ));
        }
        lines.push(String::new());
    }

    if !overall.missing_sequences.is_empty() {
        push_sequence_block(
            &mut lines,
            "## Missing Sequence Details",
            "Total missing",
            &overall.missing_sequences,
            limits,
        );
    }

    if !overall.extra_sequences.is_empty() {
        push_sequence_block(
            &mut lines,
            "## Extra Sequence Details",
            "Total extra",
            &overall.extra_sequences,
            limits,
        );
    }

    lines.join("\n")
}

/// Fenced block of sequence numbers, `sequences_per_line` per row.
fn push_sequence_block(
    lines: &mut Vec<String>,
    heading: &str,
    total_label: &str,
    seqs: &[i64],
    limits: &ReportLimits,
) {
    let cap = limits.markdown_sequence_items;
    let per_line = limits.sequences_per_line.max(1);

    lines.push(heading.to_string());
    lines.push(String::new());
    lines.push(format!("{total_label}: {}", fmt_num(seqs.len())));
    lines.push(String::new());

    lines.push("```".to_string());
    for chunk in seqs[..seqs.len().min(cap)].chunks(per_line) {
        let row: Vec<String> = chunk.iter().map(i64::to_string).collect();
        lines.push(row.join(", "));
    }
    lines.push("```".to_string());

    if seqs.len() > cap {
        lines.push(String::new());
        lines.push(format!("... and {} more", seqs.len() - cap));
    }
    lines.push(String::new());
}
