//! Command handler modules for bgv-cli.
//!
//! Shared utilities used by multiple command paths live here.

pub mod validate;

use std::fmt;

use chrono::{DateTime, Utc};

/// Bad flag combination or value, detected before any collection starts.
/// `main` maps this to exit code 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError(pub String);

impl UsageError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}

/// Parse an optional `--flag` timestamp. Naive values are taken as UTC.
pub fn parse_timestamp_flag(
    flag: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, UsageError> {
    match raw {
        None => Ok(None),
        Some(s) => bgv_ingest::fields::parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| UsageError::new(format!("invalid ISO 8601 timestamp for {flag}: {s:?}"))),
    }
}
