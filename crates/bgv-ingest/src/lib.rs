//! bgv-ingest
//!
//! Acquisition adapters that turn producer/consumer logs into
//! [`bgv_reconcile::ProducedRecord`] / [`bgv_reconcile::ConsumedRecord`] values.
//!
//! Two sources:
//! - [`FileSource`]: JSON-lines log files on local disk
//! - [`LokiSource`]: Loki `query_range` HTTP API with cursor pagination
//!
//! Malformed entries never fail a fetch. They are returned to the caller as
//! [`SkippedEntry`] diagnostics next to the good records. Only source-level
//! problems (unreachable, unreadable, bad response) surface as [`SourceError`].

pub mod fields;
pub mod file;
pub mod loki;
pub mod source;

pub use file::FileSource;
pub use loki::{LokiSource, LokiSourceConfig};
pub use source::{Ingested, RecordSource, SkippedEntry, SourceError, TimeRange};
