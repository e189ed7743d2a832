//! `bgv validate`: collect, reconcile, report.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bgv_config::{LoadedConfig, ValidatorConfig};
use bgv_ingest::{
    FileSource, Ingested, LokiSource, LokiSourceConfig, RecordSource, SkippedEntry, TimeRange,
};
use bgv_reconcile::{Analysis, SwitchWindow};
use bgv_report::{
    render_json, render_markdown, render_text, write_report, ReportLimits, ReportMeta, Strategy,
    ValidationReport, VerdictPolicy,
};
use chrono::Utc;
use clap::{Args, ValueEnum};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{parse_timestamp_flag, UsageError};

/// Skipped entries logged individually per side; the rest are summarized.
const SKIPPED_LOG_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Loki,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Separate consumer group + offset sync
    #[value(name = "B")]
    B,
    /// Pause/resume atomic switch
    #[value(name = "C")]
    C,
    /// Kafka Connect REST API / Strimzi CRD
    #[value(name = "E")]
    E,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::B => Strategy::B,
            StrategyArg::C => Strategy::C,
            StrategyArg::E => Strategy::E,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Data source: 'loki' for the Loki HTTP API, 'file' for local log files
    #[arg(long, value_enum)]
    pub source: SourceKind,

    /// Loki endpoint URL (overrides BGV_LOKI_URL and loki.url)
    #[arg(long)]
    pub loki_url: Option<String>,

    /// Test start time (ISO 8601). Required for the Loki source
    #[arg(long)]
    pub start: Option<String>,

    /// Test end time (ISO 8601). Required for the Loki source
    #[arg(long)]
    pub end: Option<String>,

    /// Switch start time (ISO 8601). Enables phase analysis together with --switch-end
    #[arg(long)]
    pub switch_start: Option<String>,

    /// Switch end time (ISO 8601)
    #[arg(long)]
    pub switch_end: Option<String>,

    /// Strategy under test
    #[arg(long, value_enum, ignore_case = true)]
    pub strategy: StrategyArg,

    /// Write a Markdown report to this path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write the full JSON report to this path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Producer log file (required for the file source)
    #[arg(long)]
    pub producer_log: Option<PathBuf>,

    /// Consumer log file (required for the file source)
    #[arg(long)]
    pub consumer_log: Option<PathBuf>,

    /// Layered config paths in merge order
    #[arg(long = "config")]
    pub config_paths: Vec<PathBuf>,

    /// Duplication tolerance in percent (overrides verdict.duplication_tolerance_pct)
    #[arg(long, allow_negative_numbers = true)]
    pub duplication_tolerance: Option<f64>,

    /// Enable verbose (DEBUG) logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Where records come from, after flag validation.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePlan {
    Loki {
        url_override: Option<String>,
    },
    File {
        producer_log: PathBuf,
        consumer_log: PathBuf,
    },
}

/// Validated flags. Built before any I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatePlan {
    pub source: SourcePlan,
    pub range: TimeRange,
    pub window: Option<SwitchWindow>,
    pub strategy: Strategy,
    pub tolerance_override: Option<f64>,
}

/// Check flag values and combinations.
pub fn plan(args: &ValidateArgs) -> Result<ValidatePlan, UsageError> {
    let start = parse_timestamp_flag("--start", args.start.as_deref())?;
    let end = parse_timestamp_flag("--end", args.end.as_deref())?;
    let switch_start = parse_timestamp_flag("--switch-start", args.switch_start.as_deref())?;
    let switch_end = parse_timestamp_flag("--switch-end", args.switch_end.as_deref())?;

    let source = match args.source {
        SourceKind::Loki => {
            if start.is_none() || end.is_none() {
                return Err(UsageError::new(
                    "--start and --end are required when --source is 'loki'",
                ));
            }
            SourcePlan::Loki {
                url_override: args.loki_url.clone(),
            }
        }
        SourceKind::File => match (&args.producer_log, &args.consumer_log) {
            (Some(p), Some(c)) => SourcePlan::File {
                producer_log: p.clone(),
                consumer_log: c.clone(),
            },
            _ => {
                return Err(UsageError::new(
                    "--producer-log and --consumer-log are required when --source is 'file'",
                ))
            }
        },
    };

    let window = match (switch_start, switch_end) {
        (None, None) => None,
        (Some(s), Some(e)) => Some(
            SwitchWindow::new(s, e)
                .map_err(|_| UsageError::new("--switch-start must be before --switch-end"))?,
        ),
        _ => {
            return Err(UsageError::new(
                "--switch-start and --switch-end must both be provided or both omitted",
            ))
        }
    };

    if let (Some(s), Some(e)) = (start, end) {
        if s >= e {
            return Err(UsageError::new("--start must be before --end"));
        }
    }

    if let Some(tol) = args.duplication_tolerance {
        if !tol.is_finite() || tol < 0.0 {
            return Err(UsageError::new(format!(
                "--duplication-tolerance must be >= 0 (got {tol})"
            )));
        }
    }

    Ok(ValidatePlan {
        source,
        range: TimeRange::new(start, end),
        window,
        strategy: args.strategy.into(),
        tolerance_override: args.duplication_tolerance,
    })
}

pub async fn run(args: ValidateArgs) -> Result<()> {
    let plan = plan(&args)?;

    let loaded = load_config(&args.config_paths)?;
    let settings = loaded.settings()?;
    debug!(config_hash = %loaded.config_hash, "config loaded");

    let policy = VerdictPolicy {
        duplication_tolerance_pct: plan
            .tolerance_override
            .unwrap_or(settings.verdict.duplication_tolerance_pct),
    };

    let source = build_source(&plan.source, &settings)?;
    info!(source = source.name(), "collecting sequences");

    let produced = source
        .fetch_produced(&plan.range)
        .await
        .with_context(|| format!("collect producer records from {} failed", source.name()))?;
    let consumed = source
        .fetch_consumed(&plan.range)
        .await
        .with_context(|| format!("collect consumer records from {} failed", source.name()))?;

    log_ingested("producer", &produced);
    log_ingested("consumer", &consumed);

    let analysis = Analysis::run(&produced.records, &consumed.records, plan.window.as_ref());

    let meta = ReportMeta {
        run_id: Uuid::new_v4(),
        strategy: plan.strategy,
        source: source.name().to_string(),
        period_start: plan.range.start,
        period_end: plan.range.end,
        switch_window: plan.window,
        generated_at: Utc::now(),
        config_hash: loaded.config_hash.clone(),
    };
    let report = ValidationReport::new(meta, analysis, &policy);
    let limits = report_limits(&settings);

    print!("{}", render_text(&report, &limits));

    if let Some(path) = &args.output {
        write_report(&render_markdown(&report, &limits), path)?;
        info!(path = %path.display(), "markdown report written");
        println!("Markdown report written to: {}", path.display());
    }

    if let Some(path) = &args.json_output {
        write_report(&render_json(&report)?, path)?;
        info!(path = %path.display(), "json report written");
        println!("JSON report written to: {}", path.display());
    }

    info!(
        run_id = %report.meta.run_id,
        strategy = report.meta.strategy.code(),
        verdict = report.verdict.label(),
        "validation complete"
    );
    Ok(())
}

fn load_config(paths: &[PathBuf]) -> Result<LoadedConfig> {
    if paths.is_empty() {
        return bgv_config::load_layered_yaml_from_strings(&[]);
    }
    bgv_config::load_layered_yaml(paths)
}

fn build_source(plan: &SourcePlan, settings: &ValidatorConfig) -> Result<Box<dyn RecordSource>> {
    match plan {
        SourcePlan::File {
            producer_log,
            consumer_log,
        } => {
            info!(
                producer = %producer_log.display(),
                consumer = %consumer_log.display(),
                "reading sequences from files"
            );
            Ok(Box::new(FileSource::new(producer_log, consumer_log)))
        }
        SourcePlan::Loki { url_override } => {
            let loki = &settings.loki;
            let auth = bgv_config::resolve_loki_auth(loki)?;
            let base_url = loki.effective_url(url_override.as_deref());
            info!(url = %base_url, "querying loki");

            let cfg = LokiSourceConfig {
                base_url,
                timeout: Duration::from_secs(loki.timeout_secs),
                page_limit: loki.page_limit,
                producer_query: loki.producer_query.clone(),
                consumer_query: loki.consumer_query.clone(),
                bearer_token: auth.bearer_token,
                tenant_id: loki.tenant_id.clone(),
            };
            let source = LokiSource::new(cfg).context("loki source setup failed")?;
            Ok(Box::new(source))
        }
    }
}

fn report_limits(settings: &ValidatorConfig) -> ReportLimits {
    let r = &settings.report;
    ReportLimits {
        text_duplicate_rows: r.text_duplicate_rows,
        text_missing_sequences: r.text_missing_sequences,
        markdown_duplicate_rows: r.markdown_duplicate_rows,
        markdown_sequence_items: r.markdown_sequence_items,
        sequences_per_line: r.sequences_per_line,
    }
}

fn log_ingested<R>(side: &str, ingested: &Ingested<R>) {
    info!(
        side,
        records = ingested.records.len(),
        skipped = ingested.skipped.len(),
        "sequences collected"
    );
    log_skipped(side, &ingested.skipped);
    if ingested.filtered_out > 0 {
        warn!(
            side,
            filtered_out = ingested.filtered_out,
            "records outside --start/--end were excluded"
        );
    }
    if ingested.records.is_empty() {
        warn!(side, "no {side} records found");
    }
}

fn log_skipped(side: &str, skipped: &[SkippedEntry]) {
    for entry in skipped.iter().take(SKIPPED_LOG_LIMIT) {
        warn!(
            side,
            location = %entry.location,
            reason = %entry.reason,
            excerpt = %entry.excerpt,
            "skipped malformed entry"
        );
    }
    if skipped.len() > SKIPPED_LOG_LIMIT {
        warn!(
            side,
            more = skipped.len() - SKIPPED_LOG_LIMIT,
            "further malformed entries skipped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_args() -> ValidateArgs {
        ValidateArgs {
            source: SourceKind::File,
            loki_url: None,
            start: None,
            end: None,
            switch_start: None,
            switch_end: None,
            strategy: StrategyArg::C,
            output: None,
            json_output: None,
            producer_log: Some(PathBuf::from("p.log")),
            consumer_log: Some(PathBuf::from("c.log")),
            config_paths: Vec::new(),
            duplication_tolerance: None,
            verbose: false,
        }
    }

    fn err(args: ValidateArgs) -> String {
        plan(&args).unwrap_err().0
    }

    #[test]
    fn file_source_without_time_range_is_valid() {
        let p = plan(&file_args()).unwrap();
        assert!(p.range.is_unbounded());
        assert!(p.window.is_none());
        assert_eq!(p.strategy, Strategy::C);
    }

    #[test]
    fn loki_requires_start_and_end() {
        let mut a = file_args();
        a.source = SourceKind::Loki;
        a.start = Some("2026-02-20T10:00:00Z".to_string());
        assert!(err(a).contains("--start and --end"));
    }

    #[test]
    fn file_requires_both_logs() {
        let mut a = file_args();
        a.consumer_log = None;
        assert!(err(a).contains("--producer-log and --consumer-log"));
    }

    #[test]
    fn switch_bounds_come_in_pairs_and_order() {
        let mut a = file_args();
        a.switch_start = Some("2026-02-20T10:05:00Z".to_string());
        assert!(err(a.clone()).contains("both be provided"));

        a.switch_end = Some("2026-02-20T10:05:00Z".to_string());
        assert!(err(a.clone()).contains("--switch-start must be before --switch-end"));

        a.switch_end = Some("2026-02-20T10:05:05Z".to_string());
        assert!(plan(&a).unwrap().window.is_some());
    }

    #[test]
    fn start_must_precede_end() {
        let mut a = file_args();
        a.start = Some("2026-02-20T10:10:00Z".to_string());
        a.end = Some("2026-02-20T10:00:00Z".to_string());
        assert!(err(a).contains("--start must be before --end"));
    }

    #[test]
    fn bad_values_are_usage_errors() {
        let mut a = file_args();
        a.start = Some("tomorrow".to_string());
        assert!(err(a).contains("--start"));

        let mut a = file_args();
        a.duplication_tolerance = Some(-0.5);
        assert!(err(a).contains("--duplication-tolerance"));
    }
}
