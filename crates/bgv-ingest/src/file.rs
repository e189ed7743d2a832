//! JSON-lines log file source.
//!
//! Reads producer and consumer logs written one JSON object per line, e.g.
//!
//! ```text
//! {"seq": 12345, "timestamp": "2026-02-20T10:00:01Z", "partition": 3, "offset": 567, "message": "Message sent"}
//! {"seq": 12345, "timestamp": "2026-02-20T10:00:01Z", "partition": 3, "offset": 567, "group_id": "bg-consumer-group", "message": "Message consumed"}
//! ```
//!
//! Files are streamed line by line. Blank lines are ignored; any other line
//! that does not yield a record becomes a [`SkippedEntry`].
//!
//! A requested [`TimeRange`] is applied to lines that carry a `timestamp`.
//! Lines without one have no position in time and are always kept.
//! Range-filtered records are counted in [`Ingested::filtered_out`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use bgv_reconcile::{ConsumedRecord, ProducedRecord, SequencedRecord};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::fields::{self, FieldError, JsonObject};
use crate::source::{Ingested, RecordSource, SkippedEntry, SourceError, TimeRange};

/// Reads both sides from local log files.
#[derive(Debug, Clone)]
pub struct FileSource {
    producer_log: PathBuf,
    consumer_log: PathBuf,
}

impl FileSource {
    pub fn new(producer_log: impl Into<PathBuf>, consumer_log: impl Into<PathBuf>) -> Self {
        Self {
            producer_log: producer_log.into(),
            consumer_log: consumer_log.into(),
        }
    }
}

#[async_trait::async_trait]
impl RecordSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch_produced(
        &self,
        range: &TimeRange,
    ) -> Result<Ingested<ProducedRecord>, SourceError> {
        read_producer_log(&self.producer_log, range)
    }

    async fn fetch_consumed(
        &self,
        range: &TimeRange,
    ) -> Result<Ingested<ConsumedRecord>, SourceError> {
        read_consumer_log(&self.consumer_log, range)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read a producer log. Timestamped records outside `range` are dropped.
pub fn read_producer_log(
    path: &Path,
    range: &TimeRange,
) -> Result<Ingested<ProducedRecord>, SourceError> {
    let reader = open_log(path)?;
    read_lines(reader, path, range, fields::produced_from_object)
}

/// Read a consumer log. Timestamped records outside `range` are dropped.
pub fn read_consumer_log(
    path: &Path,
    range: &TimeRange,
) -> Result<Ingested<ConsumedRecord>, SourceError> {
    let reader = open_log(path)?;
    read_lines(reader, path, range, fields::consumed_from_object)
}

/// Parse producer log text held in memory (no filesystem).
pub fn parse_producer_lines(src: &str, origin: &str) -> Ingested<ProducedRecord> {
    parse_str(src, origin, fields::produced_from_object)
}

/// Parse consumer log text held in memory (no filesystem).
pub fn parse_consumer_lines(src: &str, origin: &str) -> Ingested<ConsumedRecord> {
    parse_str(src, origin, fields::consumed_from_object)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_log(path: &Path) -> Result<BufReader<File>, SourceError> {
    let shown = path.display().to_string();
    if !path.exists() {
        return Err(SourceError::NotFound { path: shown });
    }
    if !path.is_file() {
        return Err(SourceError::Io {
            path: shown,
            cause: "not a regular file".to_string(),
        });
    }
    let file = File::open(path).map_err(|e| SourceError::Io {
        path: shown,
        cause: e.to_string(),
    })?;
    Ok(BufReader::new(file))
}

fn parse_str<R, F>(src: &str, origin: &str, build: F) -> Ingested<R>
where
    R: SequencedRecord,
    F: Fn(&JsonObject, DateTime<Utc>) -> Result<R, FieldError>,
{
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    for (i, line) in src.lines().enumerate() {
        match parse_line(line, &build) {
            Ok(Some((r, _))) => records.push(r),
            Ok(None) => {}
            Err(e) => skipped.push(SkippedEntry::new(
                format!("{origin}:{}", i + 1),
                e.to_string(),
                line.trim(),
            )),
        }
    }
    Ingested::sorted(records, skipped)
}

/// `Ok(None)` for blank lines. The flag is set when the line had its own
/// `timestamp` (as opposed to the epoch default).
fn parse_line<R, F>(line: &str, build: &F) -> Result<Option<(R, bool)>, FieldError>
where
    F: Fn(&JsonObject, DateTime<Utc>) -> Result<R, FieldError>,
{
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let obj = fields::parse_object(line)?;
    let timestamped = obj.contains_key("timestamp");
    let ts = fields::timestamp_field(&obj)?;
    build(&obj, ts).map(|r| Some((r, timestamped)))
}

fn read_lines<R, B, F>(
    mut reader: B,
    path: &Path,
    range: &TimeRange,
    build: F,
) -> Result<Ingested<R>, SourceError>
where
    R: SequencedRecord,
    B: BufRead,
    F: Fn(&JsonObject, DateTime<Utc>) -> Result<R, FieldError>,
{
    let origin = path.display().to_string();
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut out_of_range: usize = 0;
    let mut buf: Vec<u8> = Vec::new();
    let mut line_no: usize = 0;

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(|e| SourceError::Io {
            path: origin.clone(),
            cause: e.to_string(),
        })?;
        if n == 0 {
            break;
        }
        line_no += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(s) => s,
            Err(_) => {
                let lossy = String::from_utf8_lossy(&buf);
                skipped.push(SkippedEntry::new(
                    format!("{origin}:{line_no}"),
                    "invalid utf-8",
                    lossy.trim(),
                ));
                continue;
            }
        };

        match parse_line(line, &build) {
            Ok(Some((r, timestamped))) if !timestamped || range.contains(r.timestamp()) => {
                records.push(r)
            }
            Ok(Some(_)) => out_of_range += 1,
            Ok(None) => {}
            Err(e) => skipped.push(SkippedEntry::new(
                format!("{origin}:{line_no}"),
                e.to_string(),
                line.trim(),
            )),
        }
    }

    debug!(
        path = %origin,
        lines = line_no,
        records = records.len(),
        skipped = skipped.len(),
        out_of_range,
        "log file read"
    );

    Ok(Ingested::sorted(records, skipped).with_filtered_out(out_of_range))
}
