//! Loki-backed record source.
//!
//! Queries `GET /loki/api/v1/query_range` in forward direction and pages
//! through the window by moving `start` one nanosecond past the newest entry
//! of each full page. A page shorter than `limit` (or empty) ends the scan.
//!
//! The record timestamp is the Loki entry timestamp; any `timestamp` field
//! inside the log line is ignored.

use std::fmt;
use std::time::Duration;

use bgv_reconcile::{ConsumedRecord, ProducedRecord, SequencedRecord};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::fields::{self, FieldError, JsonObject};
use crate::source::{Ingested, RecordSource, SkippedEntry, SourceError, TimeRange};

pub const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3100";
pub const DEFAULT_PAGE_LIMIT: usize = 5000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PRODUCER_QUERY: &str = r#"{app="bg-producer"} |= "Message sent" | json"#;
pub const DEFAULT_CONSUMER_QUERY: &str = r#"{app="bg-consumer"} |= "Message consumed" | json"#;

const TENANT_HEADER: &str = "X-Scope-OrgID";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Connection and query settings for [`LokiSource`].
///
/// **The bearer token is redacted in `Debug` output.**
#[derive(Clone)]
pub struct LokiSourceConfig {
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Entries requested per page.
    pub page_limit: usize,
    pub producer_query: String,
    pub consumer_query: String,
    pub bearer_token: Option<String>,
    /// Sent as `X-Scope-OrgID` for multi-tenant Loki.
    pub tenant_id: Option<String>,
}

impl Default for LokiSourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            page_limit: DEFAULT_PAGE_LIMIT,
            producer_query: DEFAULT_PRODUCER_QUERY.to_string(),
            consumer_query: DEFAULT_CONSUMER_QUERY.to_string(),
            bearer_token: None,
            tenant_id: None,
        }
    }
}

impl fmt::Debug for LokiSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LokiSourceConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("page_limit", &self.page_limit)
            .field("producer_query", &self.producer_query)
            .field("consumer_query", &self.consumer_query)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<REDACTED>"))
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// One raw log entry as returned by `query_range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LokiEntry {
    pub timestamp_ns: i64,
    pub line: String,
}

#[derive(Debug, Clone)]
pub struct LokiSource {
    cfg: LokiSourceConfig,
    http: reqwest::Client,
}

impl LokiSource {
    pub fn new(cfg: LokiSourceConfig) -> Result<Self, SourceError> {
        if cfg.page_limit == 0 {
            return Err(SourceError::Config("loki page limit must be > 0".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| SourceError::Config(format!("http client build failed: {e}")))?;
        Ok(Self { cfg, http })
    }

    pub fn base_url(&self) -> &str {
        self.cfg.base_url.trim_end_matches('/')
    }

    fn query_range_url(&self) -> String {
        format!("{}{}", self.base_url(), QUERY_RANGE_PATH)
    }

    /// Run `query` over `[start, end]`, following pages until exhausted.
    pub async fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(Vec<LokiEntry>, Vec<SkippedEntry>), SourceError> {
        let end_ns = to_nanos(end)?;
        let mut cursor_ns = to_nanos(start)?;
        let mut entries: Vec<LokiEntry> = Vec::new();
        let mut skipped: Vec<SkippedEntry> = Vec::new();
        let mut pages: usize = 0;

        loop {
            let page = self.fetch_page(query, cursor_ns, end_ns).await?;
            pages += 1;

            let page_len = page.entries.len() + page.skipped.len();
            let newest_ns = page.entries.iter().map(|e| e.timestamp_ns).max();
            entries.extend(page.entries);
            skipped.extend(page.skipped);

            debug!(
                page = pages,
                page_entries = page_len,
                total_entries = entries.len(),
                "loki page fetched"
            );

            if page_len < self.cfg.page_limit {
                break;
            }
            // A full page always moves the cursor forward or the scan stops.
            match newest_ns {
                Some(ns) if ns >= cursor_ns && ns < end_ns => cursor_ns = ns + 1,
                _ => break,
            }
        }

        debug!(pages, entries = entries.len(), "loki query complete");
        Ok((entries, skipped))
    }

    async fn fetch_page(
        &self,
        query: &str,
        start_ns: i64,
        end_ns: i64,
    ) -> Result<Page, SourceError> {
        let start_s = start_ns.to_string();
        let end_s = end_ns.to_string();
        let limit_s = self.cfg.page_limit.to_string();

        let mut req = self.http.get(self.query_range_url()).query(&[
            ("query", query),
            ("start", start_s.as_str()),
            ("end", end_s.as_str()),
            ("limit", limit_s.as_str()),
            ("direction", "forward"),
        ]);
        if let Some(token) = &self.cfg.bearer_token {
            req = req.bearer_auth(token);
        }
        if let Some(tenant) = &self.cfg.tenant_id {
            req = req.header(TENANT_HEADER, tenant);
        }

        let resp = req.send().await.map_err(|e| SourceError::Connectivity {
            source: self.base_url().to_string(),
            cause: describe_transport_error(&e, self.cfg.timeout),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Format {
                source: self.base_url().to_string(),
                detail: format!(
                    "query failed (HTTP {}): {}",
                    status.as_u16(),
                    truncate(body.trim(), 500)
                ),
            });
        }

        let body: QueryRangeResponse = resp.json().await.map_err(|e| SourceError::Format {
            source: self.base_url().to_string(),
            detail: format!("response json decode failed: {e}"),
        })?;

        if body.status != "success" {
            return Err(SourceError::Format {
                source: self.base_url().to_string(),
                detail: format!("query returned non-success status '{}'", body.status),
            });
        }

        Ok(body.into_page())
    }

    async fn fetch_records<R, F>(
        &self,
        query: &str,
        range: &TimeRange,
        build: F,
    ) -> Result<Ingested<R>, SourceError>
    where
        R: SequencedRecord,
        F: Fn(&JsonObject, DateTime<Utc>) -> Result<R, FieldError>,
    {
        let (start, end) = match (range.start, range.end) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                return Err(SourceError::Config(
                    "loki source requires both a start and an end time".to_string(),
                ))
            }
        };

        let (entries, mut skipped) = self.query_range(query, start, end).await?;
        let mut records = Vec::with_capacity(entries.len());

        for entry in entries {
            let ts = Utc.timestamp_nanos(entry.timestamp_ns);
            let built = fields::parse_object(&entry.line).and_then(|obj| build(&obj, ts));
            match built {
                Ok(r) => records.push(r),
                Err(e) => skipped.push(SkippedEntry::new(
                    format!("loki@{}", entry.timestamp_ns),
                    e.to_string(),
                    &entry.line,
                )),
            }
        }

        Ok(Ingested::sorted(records, skipped))
    }
}

#[async_trait::async_trait]
impl RecordSource for LokiSource {
    fn name(&self) -> &'static str {
        "loki"
    }

    async fn fetch_produced(
        &self,
        range: &TimeRange,
    ) -> Result<Ingested<ProducedRecord>, SourceError> {
        self.fetch_records(&self.cfg.producer_query, range, fields::produced_from_object)
            .await
    }

    async fn fetch_consumed(
        &self,
        range: &TimeRange,
    ) -> Result<Ingested<ConsumedRecord>, SourceError> {
        self.fetch_records(&self.cfg.consumer_query, range, fields::consumed_from_object)
            .await
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

struct Page {
    entries: Vec<LokiEntry>,
    skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Deserialize)]
struct QueryRangeResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryRangeData>,
}

#[derive(Debug, Deserialize)]
struct QueryRangeData {
    #[serde(default)]
    result: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
struct StreamResult {
    /// `[timestamp_ns, line]`, optionally followed by structured metadata.
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl QueryRangeResponse {
    fn into_page(self) -> Page {
        let mut entries = Vec::new();
        let mut skipped = Vec::new();

        let streams = self.data.map(|d| d.result).unwrap_or_default();
        for value in streams.into_iter().flat_map(|s| s.values) {
            let ts = value.first().and_then(Value::as_str);
            let line = value.get(1).and_then(Value::as_str);
            match (ts.and_then(|t| t.parse::<i64>().ok()), line) {
                (Some(timestamp_ns), Some(line)) => entries.push(LokiEntry {
                    timestamp_ns,
                    line: line.to_string(),
                }),
                _ => {
                    let raw = Value::Array(value).to_string();
                    skipped.push(SkippedEntry::new("loki", "malformed stream value", &raw));
                }
            }
        }

        Page { entries, skipped }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_nanos(dt: DateTime<Utc>) -> Result<i64, SourceError> {
    dt.timestamp_nanos_opt().ok_or_else(|| {
        SourceError::Config(format!(
            "timestamp {} outside the nanosecond epoch range",
            dt.to_rfc3339()
        ))
    })
}

fn describe_transport_error(e: &reqwest::Error, timeout: Duration) -> String {
    if e.is_timeout() {
        format!("request timed out after {}s: {e}", timeout.as_secs())
    } else {
        e.to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
